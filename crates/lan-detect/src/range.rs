//! IPv4 sweep ranges
//!
//! Expands a CIDR block into the ordered list of candidate host addresses.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;

use crate::error::DetectError;

/// Largest expansion accepted by [`AddressRange::hosts`] (one /16)
pub const DEFAULT_MAX_HOSTS: usize = 65_534;

/// A CIDR range to sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    network: Ipv4Network,
}

impl AddressRange {
    pub fn new(network: Ipv4Network) -> Self {
        Self { network }
    }

    /// Network address of the block
    pub fn network(&self) -> Ipv4Addr {
        self.network.network()
    }

    /// Broadcast address of the block
    pub fn broadcast(&self) -> Ipv4Addr {
        self.network.broadcast()
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    /// Whether `addr` is a host address of this range
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        if !self.network.contains(addr) {
            return false;
        }
        self.is_point_to_point() || !self.is_endpoint(addr)
    }

    /// /31 and /32 blocks have no network or broadcast address to skip
    fn is_point_to_point(&self) -> bool {
        self.network.prefix() >= 31
    }

    fn is_endpoint(&self, addr: Ipv4Addr) -> bool {
        addr == self.network() || addr == self.broadcast()
    }

    /// Number of candidate host addresses
    pub fn host_count(&self) -> u64 {
        let size = 1u64 << (32 - u32::from(self.network.prefix()));
        if self.is_point_to_point() {
            size
        } else {
            size - 2
        }
    }

    /// Candidate host addresses in ascending order, limited to [`DEFAULT_MAX_HOSTS`]
    pub fn hosts(&self) -> Result<Vec<Ipv4Addr>, DetectError> {
        self.hosts_limited(DEFAULT_MAX_HOSTS)
    }

    /// Candidate host addresses in ascending order.
    ///
    /// Network and broadcast addresses are excluded. Ranges larger than
    /// `max_hosts` are rejected rather than truncated.
    pub fn hosts_limited(&self, max_hosts: usize) -> Result<Vec<Ipv4Addr>, DetectError> {
        let count = self.host_count();
        if count > max_hosts as u64 {
            return Err(DetectError::InvalidRange {
                range: self.to_string(),
                reason: format!("{} hosts exceeds the limit of {}", count, max_hosts),
            });
        }

        let first = u32::from(self.network());
        let last = u32::from(self.broadcast());
        let (start, end) = if self.is_point_to_point() {
            (first, last)
        } else {
            (first + 1, last - 1)
        };

        Ok((start..=end).map(Ipv4Addr::from).collect())
    }
}

impl FromStr for AddressRange {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let network = s.parse::<Ipv4Network>().map_err(|e| DetectError::InvalidRange {
            range: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(network))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix())
    }
}
