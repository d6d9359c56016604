//! Hardware-address prefix to manufacturer lookup
//!
//! The first three octets of a hardware address (the organizationally-unique
//! prefix) identify the manufacturer. Lookup is an exact prefix match first,
//! then a coarser match on the first two octets only. The two-octet fallback
//! recovers vendors missing from a partial table at the cost of occasionally
//! attributing an unrelated manufacturer that shares the leading octets.

use std::collections::HashMap;
use std::sync::Arc;

use crate::hwaddr::HardwareAddress;

/// Label returned when no vendor matches
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Built-in prefix table. Order matters: it is the tie-break for the
/// two-octet fallback.
const BUILTIN_PREFIXES: &[(&str, &str)] = &[
    ("00:1A:11", "Google"),
    ("00:50:F2", "Microsoft"),
    ("B8:27:EB", "Raspberry Pi Foundation"),
    ("DC:A6:32", "Raspberry Pi Trading"),
    ("3C:22:FB", "Apple"),
    ("68:A8:6D", "Apple"),
    ("AC:DE:48", "Apple"),
    ("00:0C:29", "VMware"),
    ("08:00:27", "VirtualBox"),
    ("50:46:5D", "Hon Hai Precision (Foxconn)"),
    ("00:E0:4C", "Realtek"),
    ("00:1B:63", "Apple"),
    ("28:6A:BA", "Apple"),
    ("F0:18:98", "Apple"),
    ("A4:5E:60", "Apple"),
    ("00:25:00", "Apple"),
    ("00:26:08", "Apple"),
];

#[derive(Debug, Clone)]
struct PrefixEntry {
    short: String,
    vendor: String,
}

/// Immutable prefix table, built once and shared between resolvers
#[derive(Debug, Clone, Default)]
pub struct VendorTable {
    entries: Vec<PrefixEntry>,
    exact: HashMap<String, usize>,
}

/// Split hardware-address text into normalized octet strings
fn octets_of(text: &str) -> Vec<String> {
    text.trim()
        .to_uppercase()
        .split([':', '-'])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl VendorTable {
    /// Build a table from `(prefix, vendor)` pairs in the given order.
    ///
    /// Prefixes with fewer than three octets are skipped. When a prefix is
    /// listed twice the first occurrence wins.
    pub fn from_entries<I, P, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<str>,
        V: Into<String>,
    {
        let mut table = Self::default();
        for (prefix, vendor) in entries {
            let octets = octets_of(prefix.as_ref());
            if octets.len() < 3 {
                continue;
            }
            let prefix = octets[..3].join(":");
            if table.exact.contains_key(&prefix) {
                continue;
            }
            table.exact.insert(prefix, table.entries.len());
            table.entries.push(PrefixEntry {
                short: octets[..2].join(":"),
                vendor: vendor.into(),
            });
        }
        table
    }

    /// The built-in table of common home-network vendors
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_PREFIXES.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact three-octet prefix match
    pub fn exact(&self, prefix: &str) -> Option<&str> {
        self.exact
            .get(prefix)
            .map(|&i| self.entries[i].vendor.as_str())
    }

    /// First entry (in table order) whose leading two octets equal `short`
    pub fn partial(&self, short: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.short == short)
            .map(|e| e.vendor.as_str())
    }
}

/// Resolves hardware addresses to manufacturer labels
#[derive(Debug, Clone)]
pub struct VendorResolver {
    table: Arc<VendorTable>,
}

impl VendorResolver {
    pub fn new(table: Arc<VendorTable>) -> Self {
        Self { table }
    }

    /// Resolver over the built-in table
    pub fn builtin() -> Self {
        Self::new(Arc::new(VendorTable::builtin()))
    }

    /// Resolve hardware-address text to a vendor label.
    ///
    /// Text with fewer than three octets resolves to [`UNKNOWN_VENDOR`].
    pub fn resolve(&self, hardware_address: &str) -> &str {
        let octets = octets_of(hardware_address);
        if octets.len() < 3 {
            return UNKNOWN_VENDOR;
        }

        let prefix = octets[..3].join(":");
        if let Some(vendor) = self.table.exact(&prefix) {
            return vendor;
        }

        let short = octets[..2].join(":");
        self.table.partial(&short).unwrap_or(UNKNOWN_VENDOR)
    }

    pub fn resolve_address(&self, mac: &HardwareAddress) -> &str {
        self.resolve(&mac.to_string())
    }
}

impl Default for VendorResolver {
    fn default() -> Self {
        Self::builtin()
    }
}
