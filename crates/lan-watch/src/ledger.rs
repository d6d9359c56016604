//! Known-device ledger
//!
//! The ledger is the set of devices the operator has accepted, keyed by
//! hardware address. It lives in memory and is mirrored to a
//! [`LedgerStore`]; the in-memory copy stays authoritative when the store
//! cannot be written. Entries are never removed automatically, so a device
//! that left the network long ago is still "known".

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lan_detect::{DeviceType, HardwareAddress};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::LedgerError;
use crate::record::DeviceRecord;

/// A device accepted as known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub hardware_address: HardwareAddress,
    /// Last address the device was accepted at
    pub address: Ipv4Addr,
    #[serde(default)]
    pub hostname: Option<String>,
    pub vendor: String,
    pub device_type: DeviceType,
    pub first_seen: DateTime<Utc>,
    /// Operator-assigned name; the scanner never sets this
    #[serde(default)]
    pub friendly_name: Option<String>,
}

impl LedgerEntry {
    /// Entry for an observed device, or `None` when it has no hardware address
    pub fn from_record(record: &DeviceRecord) -> Option<Self> {
        Some(Self {
            hardware_address: record.hardware_address()?,
            address: record.address(),
            hostname: record.hostname().map(str::to_string),
            vendor: record.vendor().to_string(),
            device_type: record.device_type(),
            first_seen: record.first_seen(),
            friendly_name: None,
        })
    }
}

/// Durable ledger storage
pub trait LedgerStore: Send + Sync {
    /// Load all entries. A store that does not exist yet is empty.
    fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Replace the stored entries
    fn save(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// JSON file store: an object keyed by hardware address
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No known devices file at {}, starting fresh", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let map: BTreeMap<HardwareAddress, LedgerEntry> =
            serde_json::from_str(&json).map_err(|source| LedgerError::Parse {
                path: self.path.clone(),
                source,
            })?;

        // The map key is authoritative over the copy inside the entry
        Ok(map
            .into_iter()
            .map(|(mac, mut entry)| {
                entry.hardware_address = mac;
                entry
            })
            .collect())
    }

    fn save(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let map: BTreeMap<&HardwareAddress, &LedgerEntry> =
            entries.iter().map(|e| (&e.hardware_address, e)).collect();
        let json = serde_json::to_string_pretty(&map)?;

        // Write then rename so a crash never leaves a truncated ledger
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read-only view of the ledger keys, taken when a sweep starts
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    keys: Arc<HashSet<HardwareAddress>>,
}

impl LedgerSnapshot {
    pub fn contains(&self, mac: &HardwareAddress) -> bool {
        self.keys.contains(mac)
    }
}

/// The known-device ledger
#[derive(Default)]
pub struct Ledger {
    entries: BTreeMap<HardwareAddress, LedgerEntry>,
    store: Option<Box<dyn LedgerStore>>,
}

impl Ledger {
    /// Ledger without durable storage
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Empty ledger backed by `store`; call [`Ledger::load_all`] to read it
    pub fn with_store<S: LedgerStore + 'static>(store: S) -> Self {
        Self {
            entries: BTreeMap::new(),
            store: Some(Box::new(store)),
        }
    }

    /// Ledger backed by `store`, loaded immediately
    pub fn open<S: LedgerStore + 'static>(store: S) -> Result<Self, LedgerError> {
        let mut ledger = Self::with_store(store);
        ledger.load_all()?;
        Ok(ledger)
    }

    /// Replace the in-memory entries with the stored ones
    pub fn load_all(&mut self) -> Result<usize, LedgerError> {
        let Some(store) = &self.store else {
            return Ok(self.entries.len());
        };

        let loaded = store.load()?;
        self.entries = loaded
            .into_iter()
            .map(|e| (e.hardware_address, e))
            .collect();
        info!(
            "Loaded {} known device(s) from {}",
            self.entries.len(),
            store.location()
        );
        Ok(self.entries.len())
    }

    /// Write all entries to the store
    pub fn persist_all(&self) -> Result<(), LedgerError> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let entries: Vec<LedgerEntry> = self.entries.values().cloned().collect();
        match store.save(&entries) {
            Ok(()) => {
                info!("Saved {} known device(s) to {}", entries.len(), store.location());
                Ok(())
            }
            Err(e) => {
                error!("Failed to save known devices: {}", e);
                Err(e)
            }
        }
    }

    pub fn contains(&self, mac: &HardwareAddress) -> bool {
        self.entries.contains_key(mac)
    }

    pub fn get(&self, mac: &HardwareAddress) -> Option<&LedgerEntry> {
        self.entries.get(mac)
    }

    /// Insert or replace the entry for its hardware address.
    ///
    /// An existing friendly name is kept when `entry` does not carry one.
    pub fn upsert(&mut self, mut entry: LedgerEntry) {
        if let Some(existing) = self.entries.get(&entry.hardware_address) {
            if entry.friendly_name.is_none() {
                entry.friendly_name = existing.friendly_name.clone();
            }
            debug!("Updating known device {}", entry.hardware_address);
        }
        self.entries.insert(entry.hardware_address, entry);
    }

    /// Set or clear the operator-assigned name. Returns false for unknown devices.
    pub fn set_friendly_name(&mut self, mac: &HardwareAddress, name: Option<String>) -> bool {
        match self.entries.get_mut(mac) {
            Some(entry) => {
                entry.friendly_name = name;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in hardware-address order
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            keys: Arc::new(self.entries.keys().copied().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(mac: &str, last: u8) -> LedgerEntry {
        LedgerEntry {
            hardware_address: mac.parse().unwrap(),
            address: Ipv4Addr::new(192, 168, 1, last),
            hostname: Some(format!("host-{}", last)),
            vendor: "Apple".to_string(),
            device_type: DeviceType::AppleDevice,
            first_seen: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            friendly_name: None,
        }
    }

    #[test]
    fn test_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(JsonFileStore::new(dir.path().join("none.json"))).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("known_devices.json");

        let mut ledger = Ledger::open(JsonFileStore::new(&path)).unwrap();
        let e = entry("AA:BB:CC:00:00:01", 1);
        ledger.upsert(e.clone());
        ledger.persist_all().unwrap();

        let reloaded = Ledger::open(JsonFileStore::new(&path)).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(&e.hardware_address), Some(&e));
    }

    #[test]
    fn test_upsert_keeps_friendly_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.json");
        let mut ledger = Ledger::open(JsonFileStore::new(&path)).unwrap();

        let mac: HardwareAddress = "AA:BB:CC:00:00:01".parse().unwrap();
        ledger.upsert(entry("AA:BB:CC:00:00:01", 1));
        assert!(ledger.set_friendly_name(&mac, Some("Kitchen speaker".into())));

        // Re-accepted at a new address without a name
        ledger.upsert(entry("AA:BB:CC:00:00:01", 42));
        ledger.persist_all().unwrap();

        let reloaded = Ledger::open(JsonFileStore::new(&path)).unwrap();
        let got = reloaded.get(&mac).unwrap();
        assert_eq!(got.address, Ipv4Addr::new(192, 168, 1, 42));
        assert_eq!(got.friendly_name.as_deref(), Some("Kitchen speaker"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_upsert_explicit_friendly_name_replaces() {
        let mut ledger = Ledger::in_memory();
        let mut e = entry("AA:BB:CC:00:00:01", 1);
        e.friendly_name = Some("Old".into());
        ledger.upsert(e.clone());
        e.friendly_name = Some("New".into());
        ledger.upsert(e.clone());
        assert_eq!(
            ledger.get(&e.hardware_address).unwrap().friendly_name.as_deref(),
            Some("New")
        );
    }

    #[test]
    fn test_set_friendly_name_unknown_device() {
        let mut ledger = Ledger::in_memory();
        let mac: HardwareAddress = "AA:BB:CC:00:00:09".parse().unwrap();
        assert!(!ledger.set_friendly_name(&mac, Some("x".into())));
    }

    #[test]
    fn test_corrupt_store_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Ledger::open(JsonFileStore::new(&path)).err().unwrap();
        assert!(matches!(err, LedgerError::Parse { .. }));
    }

    #[test]
    fn test_persist_failure_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("known.json");
        std::fs::create_dir(&path).unwrap();

        let mut ledger = Ledger::with_store(JsonFileStore::new(&path));
        let e = entry("AA:BB:CC:00:00:01", 1);
        ledger.upsert(e.clone());
        assert!(ledger.persist_all().is_err());
        assert!(ledger.contains(&e.hardware_address));
    }

    #[test]
    fn test_stale_entries_are_never_pruned() {
        // Known limitation: entries stay until an operator removes the file
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.json");
        let mut ledger = Ledger::open(JsonFileStore::new(&path)).unwrap();
        ledger.upsert(entry("AA:BB:CC:00:00:01", 1));
        ledger.upsert(entry("AA:BB:CC:00:00:02", 2));
        ledger.persist_all().unwrap();
        ledger.load_all().unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut ledger = Ledger::in_memory();
        let snapshot = ledger.snapshot();
        let e = entry("AA:BB:CC:00:00:01", 1);
        ledger.upsert(e.clone());
        assert!(!snapshot.contains(&e.hardware_address));
        assert!(ledger.snapshot().contains(&e.hardware_address));
    }

    #[test]
    fn test_store_file_is_keyed_by_mac() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.json");
        let store = JsonFileStore::new(&path);
        store.save(&[entry("aa:bb:cc:00:00:01", 1)]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("AA:BB:CC:00:00:01").is_some());
        assert_eq!(raw["AA:BB:CC:00:00:01"]["device_type"], "Apple Device");
    }
}
