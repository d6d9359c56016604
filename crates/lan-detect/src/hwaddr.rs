//! Hardware (link-layer) address type
//!
//! Addresses are accepted with `:` or `-` separators in either case and
//! always displayed as uppercase, colon-separated octets.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DetectError;

/// Six-octet hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HardwareAddress([u8; 6]);

fn mac_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // BSD and macOS `arp` print octets without leading zeros
        Regex::new(r"\b(?:[0-9A-Fa-f]{1,2}[:-]){5}[0-9A-Fa-f]{1,2}\b")
            .expect("static pattern is valid")
    })
}

impl HardwareAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// All-zero address, reported by neighbor caches for incomplete entries
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// The organizationally-unique prefix, e.g. `B8:27:EB`
    pub fn prefix(&self) -> String {
        format!("{:02X}:{:02X}:{:02X}", self.0[0], self.0[1], self.0[2])
    }

    /// Find the first hardware address in free-form text (command output,
    /// neighbor table lines). All-zero matches are skipped.
    pub fn find_in(text: &str) -> Option<Self> {
        mac_pattern()
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<HardwareAddress>().ok())
            .find(|mac| !mac.is_zero())
    }
}

impl FromStr for HardwareAddress {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(DetectError::InvalidHardwareAddress(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            if !(1..=2).contains(&part.len()) {
                return Err(DetectError::InvalidHardwareAddress(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| DetectError::InvalidHardwareAddress(s.to_string()))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl Serialize for HardwareAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HardwareAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
