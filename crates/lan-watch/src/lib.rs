//! LAN Watch Engine
//!
//! This crate turns per-host probes from `lan-detect` into network sweeps
//! and keeps track of which devices have been seen before.
//!
//! # Architecture
//!
//! - **Scanner**: sweeps an address range with a bounded pool of probe tasks
//!   and produces an ordered [`ScanReport`]
//! - **Ledger**: the persisted set of accepted devices, keyed by hardware
//!   address; sweeps read an immutable snapshot of it
//! - **Watcher**: reruns the scanner on an interval and forwards new devices
//!   to an [`AlertSink`]
//!
//! # Example
//!
//! ```rust,no_run
//! use lan_detect::{HostProber, SystemProbe, VendorResolver};
//! use lan_watch::{accept_new_device, JsonFileStore, Ledger, Scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let scanner = Scanner::new(HostProber::new(SystemProbe::new()?), VendorResolver::builtin());
//! let mut ledger = Ledger::open(JsonFileStore::new("known_devices.json"))?;
//!
//! let report = scanner
//!     .scan(&"192.168.1.0/24".parse()?, &ledger, &CancellationToken::new())
//!     .await?;
//! let new: Vec<_> = report.new_devices().cloned().collect();
//! for record in &new {
//!     accept_new_device(record, &mut ledger)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod alert;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod record;
pub mod watcher;

pub use alert::{AlertEvent, AlertSink, LogAlertSink, NullAlertSink, RecordingSink};
pub use engine::{accept_new_device, HostError, ScanConfig, ScanReport, Scanner};
pub use error::{LedgerError, WatchError};
pub use ledger::{JsonFileStore, Ledger, LedgerEntry, LedgerSnapshot, LedgerStore};
pub use record::DeviceRecord;
pub use watcher::{AlertOptions, Watcher};
