//! Heuristic device-type classification
//!
//! Best-effort labeling from the reverse-DNS name and vendor string. Hostname
//! rules are evaluated before vendor rules, each list in declared order; the
//! first matching rule wins.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coarse device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    MobileIos,
    MobileAndroid,
    Computer,
    SmartTv,
    Router,
    AppleDevice,
    RaspberryPi,
    SamsungDevice,
    GoogleDevice,
    Unknown,
}

impl DeviceType {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::MobileIos => "Mobile Device (iOS)",
            DeviceType::MobileAndroid => "Mobile Device (Android)",
            DeviceType::Computer => "Computer",
            DeviceType::SmartTv => "Smart TV",
            DeviceType::Router => "Router",
            DeviceType::AppleDevice => "Apple Device",
            DeviceType::RaspberryPi => "Raspberry Pi",
            DeviceType::SamsungDevice => "Samsung Device",
            DeviceType::GoogleDevice => "Google Device",
            DeviceType::Unknown => "Unknown Device",
        }
    }

    /// Inverse of [`DeviceType::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        ALL_TYPES.iter().copied().find(|t| t.label() == label)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Persisted as the label so stored ledgers stay readable
impl Serialize for DeviceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for DeviceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(DeviceType::from_label(&label).unwrap_or(DeviceType::Unknown))
    }
}

const ALL_TYPES: &[DeviceType] = &[
    DeviceType::MobileIos,
    DeviceType::MobileAndroid,
    DeviceType::Computer,
    DeviceType::SmartTv,
    DeviceType::Router,
    DeviceType::AppleDevice,
    DeviceType::RaspberryPi,
    DeviceType::SamsungDevice,
    DeviceType::GoogleDevice,
    DeviceType::Unknown,
];

/// Substring rules against the lower-cased hostname
const HOSTNAME_RULES: &[(&[&str], DeviceType)] = &[
    (&["iphone", "ipad"], DeviceType::MobileIos),
    (&["android"], DeviceType::MobileAndroid),
    (&["laptop", "pc"], DeviceType::Computer),
    (&["tv"], DeviceType::SmartTv),
    (&["router"], DeviceType::Router),
];

/// Substring rules against the lower-cased vendor
const VENDOR_RULES: &[(&str, DeviceType)] = &[
    ("apple", DeviceType::AppleDevice),
    ("raspberry", DeviceType::RaspberryPi),
    ("samsung", DeviceType::SamsungDevice),
    ("google", DeviceType::GoogleDevice),
];

/// Classify a device from its vendor label and optional hostname
pub fn classify(vendor: &str, hostname: Option<&str>) -> DeviceType {
    if let Some(hostname) = hostname {
        let hostname = hostname.to_lowercase();
        for (needles, device_type) in HOSTNAME_RULES {
            if needles.iter().any(|n| hostname.contains(n)) {
                return *device_type;
            }
        }
    }

    let vendor = vendor.to_lowercase();
    VENDOR_RULES
        .iter()
        .find(|(needle, _)| vendor.contains(needle))
        .map(|(_, device_type)| *device_type)
        .unwrap_or(DeviceType::Unknown)
}
