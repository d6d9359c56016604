//! lanwatch - watch a local network for devices not seen before

mod approve;
mod logging;
mod report;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lan_detect::{AddressRange, HardwareAddress, HostProber, SystemProbe, VendorResolver};
use lan_watch::{
    accept_new_device, JsonFileStore, Ledger, LedgerError, LogAlertSink, Scanner, Watcher,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::approve::Approval;
use crate::settings::Settings;

/// Exit code after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "lanwatch", version, about = "Watch a local network for new devices")]
struct Cli {
    /// Settings file (default: $XDG_CONFIG_HOME/lanwatch/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CIDR range to sweep, overriding the settings file
    #[arg(long, global = true)]
    range: Option<AddressRange>,

    /// Probes in flight at once
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Reachability probe timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Accept every new device without asking
    #[arg(long, global = true)]
    accept_new: bool,

    /// Never prompt for approval
    #[arg(long, global = true)]
    no_prompt: bool,

    /// Print sweep results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sweep once and review new devices (default)
    Once,
    /// Sweep on a fixed interval until interrupted
    Watch {
        /// Minutes between sweeps, overriding the settings file
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
    /// List accepted devices
    Known,
    /// Set or clear the friendly name of an accepted device
    Name {
        /// Hardware address of the device
        mac: HardwareAddress,
        /// New name; omit to clear
        name: Option<String>,
    },
    /// Write a settings file with the current values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match logging::init(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start runtime: {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    };

    // A pending prompt read may still hold stdin
    runtime.shutdown_background();
    code
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::load(cli.config.as_deref());
    if let Some(range) = cli.range {
        settings.address_range = range.to_string();
    }
    if let Some(concurrency) = cli.concurrency {
        settings.scan_concurrency = concurrency;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.probe_timeout_ms = timeout_ms;
    }
    if let Some(Command::Watch {
        interval_minutes: Some(minutes),
    }) = cli.command
    {
        settings.scan_interval_minutes = minutes;
    }
    let settings = settings.validated();

    match cli.command.unwrap_or(Command::Once) {
        Command::Once => {
            let approval = Approval::choose(cli.accept_new, cli.no_prompt, cli.json);
            scan_once(&settings, approval, cli.json).await
        }
        Command::Watch { .. } => watch(&settings, cli.accept_new, cli.json).await,
        Command::Known => {
            let ledger = open_ledger(&settings)?;
            print!("{}", report::known_table(&ledger));
            Ok(ExitCode::SUCCESS)
        }
        Command::Name { mac, name } => {
            let mut ledger = open_ledger(&settings)?;
            if !ledger.set_friendly_name(&mac, name.clone()) {
                bail!("{} is not a known device", mac);
            }
            ledger.persist_all()?;
            match name {
                Some(name) => info!("Named {} \"{}\"", mac, name),
                None => info!("Cleared the name of {}", mac),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { force } => {
            let path = cli
                .config
                .or_else(Settings::settings_path)
                .context("Could not determine settings path")?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to replace it)", path.display());
            }
            settings.save(&path)?;
            println!("Wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load the ledger, refusing to continue when the stored file is corrupt
fn open_ledger(settings: &Settings) -> anyhow::Result<Ledger> {
    let path = settings.ledger_path();
    match Ledger::open(JsonFileStore::new(&path)) {
        Ok(ledger) => Ok(ledger),
        Err(e @ LedgerError::Parse { .. }) => Err(e).context(
            "Known devices file is unreadable; fix or move it aside, it will not be overwritten",
        ),
        Err(e) => Err(e.into()),
    }
}

fn build_watcher(settings: &Settings) -> anyhow::Result<Watcher> {
    let probe = SystemProbe::new().context("Cannot probe the network (ICMP needs privileges)")?;
    let prober = HostProber::with_config(probe, settings.probe_config());
    let scanner = Scanner::with_config(prober, VendorResolver::builtin(), settings.scan_config());

    Ok(Watcher::new(scanner, settings.range()?, Arc::new(LogAlertSink))
        .with_options(settings.alert_options()))
}

/// Cancel `token` on Ctrl-C
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for probes in flight");
            token.cancel();
        }
    });
}

async fn scan_once(
    settings: &Settings,
    approval: Approval,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut ledger = open_ledger(settings)?;
    let mut watcher = build_watcher(settings)?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let report = watcher.run_once(&ledger, &cancel).await?;
    report::print_report(&report, json)?;
    if report.cancelled() {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }

    if report.new_count() > 0 && approval == Approval::Skip && !json {
        println!("\nRun with --accept-new, or interactively, to approve new devices.");
    }
    let accepted = approve::review_new_devices(&report, &mut ledger, approval, &cancel).await?;
    if accepted > 0 {
        info!("Accepted {} new device(s)", accepted);
    }

    if cancel.is_cancelled() {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

async fn watch(settings: &Settings, accept_new: bool, json: bool) -> anyhow::Result<ExitCode> {
    let mut ledger = open_ledger(settings)?;
    let mut watcher = build_watcher(settings)?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let approval = if accept_new {
        Approval::Accept
    } else {
        Approval::Skip
    };

    let mut failure = None;
    watcher
        .run(
            &mut ledger,
            settings.scan_interval().max(Duration::from_secs(1)),
            &cancel,
            |report, ledger| {
                if let Err(e) = report::print_report(report, json) {
                    warn!("Could not print report: {}", e);
                }
                if approval == Approval::Accept {
                    for record in report.new_devices() {
                        if let Err(e) = accept_new_device(record, ledger) {
                            error!("Failed to accept {}: {}", record.address(), e);
                            failure.get_or_insert(e);
                        }
                    }
                }
            },
        )
        .await;

    if let Some(e) = failure {
        return Err(e).context("Known devices could not be saved");
    }
    Ok(ExitCode::from(EXIT_INTERRUPTED))
}
