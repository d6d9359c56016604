//! Per-sweep device observations

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use lan_detect::{DeviceType, HardwareAddress};
use serde::Serialize;

/// One observation of a live host during a single sweep
///
/// Records are built once and never modified. The known/new flags are
/// derived at construction so that a record without a hardware address is
/// never known and never new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    address: Ipv4Addr,
    hardware_address: Option<HardwareAddress>,
    hostname: Option<String>,
    vendor: String,
    device_type: DeviceType,
    is_known: bool,
    is_new: bool,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl DeviceRecord {
    /// Build a record. `in_ledger` is whether the hardware address was found
    /// in the ledger snapshot; it is ignored when there is no hardware address.
    pub fn new(
        address: Ipv4Addr,
        hardware_address: Option<HardwareAddress>,
        hostname: Option<String>,
        vendor: impl Into<String>,
        device_type: DeviceType,
        in_ledger: bool,
        seen_at: DateTime<Utc>,
    ) -> Self {
        let has_mac = hardware_address.is_some();
        let is_known = has_mac && in_ledger;
        Self {
            address,
            hardware_address,
            hostname,
            vendor: vendor.into(),
            device_type,
            is_known,
            is_new: has_mac && !is_known,
            first_seen: seen_at,
            last_seen: seen_at,
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn hardware_address(&self) -> Option<HardwareAddress> {
        self.hardware_address
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn is_known(&self) -> bool {
        self.is_known
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Short status label for display
    pub fn status(&self) -> &'static str {
        if self.is_new {
            "NEW"
        } else if self.is_known {
            "Known"
        } else {
            "Unknown"
        }
    }
}
