//! Approval of new devices

use std::io::{IsTerminal, Write};

use anyhow::Context;
use colored::Colorize;
use lan_watch::{accept_new_device, DeviceRecord, Ledger, ScanReport};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How new devices are handled after a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// Accept every new device
    Accept,
    /// Ask about each one on the terminal
    Prompt,
    /// Leave them unapproved
    Skip,
}

impl Approval {
    pub fn choose(accept_new: bool, no_prompt: bool, json: bool) -> Self {
        Self::resolve(accept_new, no_prompt || json, std::io::stdin().is_terminal())
    }

    fn resolve(accept_new: bool, quiet: bool, interactive: bool) -> Self {
        if accept_new {
            Approval::Accept
        } else if quiet || !interactive {
            Approval::Skip
        } else {
            Approval::Prompt
        }
    }
}

/// `y` / `yes` in any case; anything else declines
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Ask one question. `None` when cancelled or stdin is closed.
async fn ask(record: &DeviceRecord, cancel: &CancellationToken) -> anyhow::Result<Option<bool>> {
    let mac = record
        .hardware_address()
        .map(|m| m.to_string())
        .unwrap_or_default();
    print!(
        "Add {} ({}, {}, {}) to known devices? [y/N] ",
        record.address().to_string().bold(),
        mac,
        record.vendor(),
        record.device_type()
    );
    std::io::stdout().flush().context("Failed to write prompt")?;

    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|n| (n, line))
    });

    tokio::select! {
        _ = cancel.cancelled() => {
            println!();
            Ok(None)
        }
        read = read => {
            let (n, line) = read.context("Prompt task failed")?.context("Failed to read answer")?;
            if n == 0 {
                return Ok(None);
            }
            Ok(Some(is_yes(&line)))
        }
    }
}

/// Apply `approval` to the new devices in `report`. Returns how many were accepted.
pub async fn review_new_devices(
    report: &ScanReport,
    ledger: &mut Ledger,
    approval: Approval,
    cancel: &CancellationToken,
) -> anyhow::Result<usize> {
    let mut accepted = 0;

    for record in report.new_devices() {
        let accept = match approval {
            Approval::Accept => true,
            Approval::Skip => false,
            Approval::Prompt => match ask(record, cancel).await? {
                Some(answer) => answer,
                None => break,
            },
        };

        if accept {
            accept_new_device(record, ledger)
                .with_context(|| format!("Failed to accept {}", record.address()))?;
            accepted += 1;
        } else {
            debug!("Leaving {} unapproved", record.address());
        }
    }

    Ok(accepted)
}
