//! Periodic watcher
//!
//! Runs the scanner on a fixed interval and forwards new devices and sweep
//! summaries to an [`AlertSink`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lan_detect::{AddressRange, HardwareAddress};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::alert::AlertSink;
use crate::engine::{ScanReport, Scanner};
use crate::error::WatchError;
use crate::ledger::Ledger;

/// Which notifications the watcher sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertOptions {
    /// Announce devices whose hardware address is not in the ledger
    pub new_devices: bool,
    /// Send a summary after every sweep
    pub scan_results: bool,
}

impl Default for AlertOptions {
    fn default() -> Self {
        Self {
            new_devices: true,
            scan_results: false,
        }
    }
}

/// Sweep scheduler
pub struct Watcher {
    scanner: Scanner,
    range: AddressRange,
    sink: Arc<dyn AlertSink>,
    options: AlertOptions,
    /// Hardware addresses already announced in this session
    alerted: HashSet<HardwareAddress>,
}

impl Watcher {
    pub fn new(scanner: Scanner, range: AddressRange, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            scanner,
            range,
            sink,
            options: AlertOptions::default(),
            alerted: HashSet::new(),
        }
    }

    pub fn with_options(mut self, options: AlertOptions) -> Self {
        self.options = options;
        self
    }

    /// Sweep once and send the enabled notifications.
    ///
    /// A new device is announced at most once per watcher, even if it stays
    /// unapproved across many sweeps.
    pub async fn run_once(
        &mut self,
        ledger: &Ledger,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, WatchError> {
        let report = self.scanner.scan(&self.range, ledger, cancel).await?;

        if self.options.new_devices {
            for record in report.new_devices() {
                let Some(mac) = record.hardware_address() else {
                    continue;
                };
                if self.alerted.insert(mac) {
                    self.sink.notify_new_device(record).await;
                } else {
                    debug!("{} already announced", mac);
                }
            }
        }

        if self.options.scan_results {
            self.sink.notify_scan_complete(&report).await;
        }

        Ok(report)
    }

    /// Sweep every `period` until `cancel` fires.
    ///
    /// `after_sweep` runs after each successful sweep with the report and
    /// the ledger, which it may update. A failed sweep is logged and the
    /// schedule continues. Returns the number of completed sweeps.
    pub async fn run<F>(
        &mut self,
        ledger: &mut Ledger,
        period: Duration,
        cancel: &CancellationToken,
        mut after_sweep: F,
    ) -> usize
    where
        F: FnMut(&ScanReport, &mut Ledger),
    {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Watching {} every {:?}", self.range, period);
        let mut sweeps = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_once(ledger, cancel).await {
                Ok(report) => {
                    sweeps += 1;
                    after_sweep(&report, ledger);
                    if report.cancelled() {
                        break;
                    }
                }
                Err(e) => error!("Scan of {} failed: {}", self.range, e),
            }
        }

        info!("Watcher stopped after {} sweep(s)", sweeps);
        sweeps
    }
}
