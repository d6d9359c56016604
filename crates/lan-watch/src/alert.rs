//! Alert sinks
//!
//! The watcher reports new devices and finished sweeps through an
//! [`AlertSink`]. Transport is up to the implementation; the sinks here log,
//! discard, or record events in memory.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::engine::ScanReport;
use crate::record::DeviceRecord;

/// Receiver of watcher notifications
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// A device with an unknown hardware address was seen
    async fn notify_new_device(&self, record: &DeviceRecord);

    /// A sweep finished (possibly cancelled)
    async fn notify_scan_complete(&self, report: &ScanReport);
}

/// Sink that emits structured log events
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify_new_device(&self, record: &DeviceRecord) {
        warn!(
            address = %record.address(),
            mac = %record
                .hardware_address()
                .map(|m| m.to_string())
                .unwrap_or_default(),
            vendor = record.vendor(),
            device_type = %record.device_type(),
            hostname = record.hostname().unwrap_or("-"),
            "New device detected"
        );
    }

    async fn notify_scan_complete(&self, report: &ScanReport) {
        info!(
            total = report.total(),
            known = report.known_count(),
            new = report.new_count(),
            errors = report.errors().len(),
            cancelled = report.cancelled(),
            "Network scan complete"
        );
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAlertSink;

#[async_trait]
impl AlertSink for NullAlertSink {
    async fn notify_new_device(&self, _record: &DeviceRecord) {}

    async fn notify_scan_complete(&self, _report: &ScanReport) {}
}

/// An event captured by [`RecordingSink`]
#[derive(Debug, Clone)]
pub enum AlertEvent {
    NewDevice(DeviceRecord),
    ScanComplete {
        total: usize,
        known: usize,
        new: usize,
        cancelled: bool,
    },
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events so far, oldest first
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Records announced as new, oldest first
    pub fn new_devices(&self) -> Vec<DeviceRecord> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AlertEvent::NewDevice(record) => Some(record),
                AlertEvent::ScanComplete { .. } => None,
            })
            .collect()
    }

    fn push(&self, event: AlertEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn notify_new_device(&self, record: &DeviceRecord) {
        self.push(AlertEvent::NewDevice(record.clone()));
    }

    async fn notify_scan_complete(&self, report: &ScanReport) {
        self.push(AlertEvent::ScanComplete {
            total: report.total(),
            known: report.known_count(),
            new: report.new_count(),
            cancelled: report.cancelled(),
        });
    }
}
