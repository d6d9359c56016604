//! Sweep Engine
//!
//! This module contains the scan orchestrator. A sweep expands the address
//! range, probes every candidate through a bounded pool of Tokio tasks, and
//! turns the live hosts into [`DeviceRecord`]s annotated against a snapshot
//! of the ledger taken when the sweep starts.
//!
//! # Concurrency
//!
//! - At most `concurrency` probes run at once (semaphore permits)
//! - Results are buffered by address and emitted in ascending order
//! - Cancelling stops dispatch; probes already running are awaited and
//!   their records returned with [`ScanReport::cancelled`] set

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lan_detect::{
    classify, AddressRange, HostProber, ProbeResult, VendorResolver, DEFAULT_MAX_HOSTS,
    UNKNOWN_VENDOR,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::ledger::{Ledger, LedgerEntry, LedgerSnapshot};
use crate::record::DeviceRecord;

/// Configuration for sweeps
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum number of probes in flight (values below 1 are treated as 1)
    pub concurrency: usize,
    /// Largest range a sweep will expand
    pub max_hosts: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 32,
            max_hosts: DEFAULT_MAX_HOSTS,
        }
    }
}

/// A probe that failed for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostError {
    pub address: Ipv4Addr,
    pub message: String,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    records: Vec<DeviceRecord>,
    errors: Vec<HostError>,
    cancelled: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl ScanReport {
    /// Report for a completed sweep over `records`, sorted by address
    pub fn from_records(mut records: Vec<DeviceRecord>) -> Self {
        records.sort_by_key(|r| r.address());
        let now = Utc::now();
        Self {
            records,
            errors: Vec::new(),
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }

    /// Live hosts in ascending address order
    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    /// Per-host failures in ascending address order
    pub fn errors(&self) -> &[HostError] {
        &self.errors
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn known_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_known()).count()
    }

    pub fn new_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_new()).count()
    }

    pub fn new_devices(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.iter().filter(|r| r.is_new())
    }
}

/// Network scanner
#[derive(Clone)]
pub struct Scanner {
    config: ScanConfig,
    prober: HostProber,
    vendors: VendorResolver,
}

impl Scanner {
    /// Create a scanner with default configuration
    pub fn new(prober: HostProber, vendors: VendorResolver) -> Self {
        Self::with_config(prober, vendors, ScanConfig::default())
    }

    /// Create a scanner with custom configuration
    pub fn with_config(prober: HostProber, vendors: VendorResolver, config: ScanConfig) -> Self {
        Self {
            config,
            prober,
            vendors,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Sweep `range` once.
    ///
    /// Fails before probing anything when the range is too large or the
    /// probe backend is unavailable. Everything after that is reported in
    /// the returned [`ScanReport`].
    pub async fn scan(
        &self,
        range: &AddressRange,
        ledger: &Ledger,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, WatchError> {
        let hosts = range.hosts_limited(self.config.max_hosts)?;
        self.prober.check_available().await?;

        let snapshot = ledger.snapshot();
        let concurrency = self.config.concurrency.max(1);
        let started_at = Utc::now();
        info!(
            "Scanning {} ({} addresses, {} at a time)",
            range,
            hosts.len(),
            concurrency
        );

        let permits = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        let mut cancelled = false;

        for addr in hosts {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let prober = self.prober.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                prober.probe(addr).await
            });
            in_flight.insert(handle.id(), addr);
        }

        if cancelled {
            info!(
                "Scan cancelled, waiting for {} probe(s) in flight",
                tasks.len()
            );
        }

        let mut outcomes: BTreeMap<Ipv4Addr, Result<ProbeResult, String>> = BTreeMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some(addr) = in_flight.remove(&id) {
                        outcomes.insert(addr, result.map_err(|e| e.to_string()));
                    }
                }
                Err(e) => {
                    if let Some(addr) = in_flight.remove(&e.id()) {
                        let message = if e.is_panic() {
                            "probe task panicked".to_string()
                        } else {
                            e.to_string()
                        };
                        outcomes.insert(addr, Err(message));
                    }
                }
            }
        }

        let mut records = Vec::new();
        let mut errors = Vec::new();
        for (addr, outcome) in outcomes {
            match outcome {
                Ok(result) if result.alive => {
                    records.push(self.build_record(addr, result, &snapshot));
                }
                Ok(_) => {}
                Err(message) => {
                    warn!("Probe of {} failed: {}", addr, message);
                    errors.push(HostError {
                        address: addr,
                        message,
                    });
                }
            }
        }

        let report = ScanReport {
            records,
            errors,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Scan of {} finished in {:.1}s: {} device(s), {} known, {} new, {} error(s)",
            range,
            report.elapsed().as_secs_f64(),
            report.total(),
            report.known_count(),
            report.new_count(),
            report.errors().len()
        );
        Ok(report)
    }

    fn build_record(
        &self,
        addr: Ipv4Addr,
        result: ProbeResult,
        snapshot: &LedgerSnapshot,
    ) -> DeviceRecord {
        let vendor = result
            .hardware_address
            .as_ref()
            .map(|mac| self.vendors.resolve_address(mac))
            .unwrap_or(UNKNOWN_VENDOR);
        let device_type = classify(vendor, result.hostname.as_deref());
        let in_ledger = result
            .hardware_address
            .as_ref()
            .is_some_and(|mac| snapshot.contains(mac));

        let record = DeviceRecord::new(
            addr,
            result.hardware_address,
            result.hostname,
            vendor,
            device_type,
            in_ledger,
            Utc::now(),
        );
        if record.is_new() {
            warn!("New device at {} ({}, {})", addr, vendor, device_type);
        } else {
            debug!("{} is {} ({})", addr, record.status(), device_type);
        }
        record
    }
}

/// Add a device to the ledger and persist it.
///
/// The in-memory entry stays in place when persisting fails.
pub fn accept_new_device(record: &DeviceRecord, ledger: &mut Ledger) -> Result<(), WatchError> {
    let entry = LedgerEntry::from_record(record).ok_or(WatchError::MissingHardwareAddress {
        address: record.address(),
    })?;

    info!(
        "Accepting {} ({}) at {} as a known device",
        entry.hardware_address, entry.vendor, entry.address
    );
    ledger.upsert(entry);
    ledger.persist_all()?;
    Ok(())
}
