//! Probing backed by the host operating system
//!
//! - Reachability: one ICMP echo request via `surge-ping`
//! - Hardware address: the kernel neighbor table (`/proc/net/arp`), falling
//!   back to `arp -n` where procfs is unavailable
//! - Hostname: reverse lookup through the system resolver

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dns_lookup::lookup_addr;
use surge_ping::{Client, Config, PingIdentifier, PingSequence, SurgeError};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::DetectError;
use crate::hwaddr::HardwareAddress;
use crate::probe::HostProbe;

const NEIGHBOR_TABLE: &str = "/proc/net/arp";

/// Echo payload size, matching the default of the `ping` utility
const PAYLOAD_LEN: usize = 56;

/// Operating-system probe
pub struct SystemProbe {
    client: Client,
    next_id: AtomicU16,
}

impl SystemProbe {
    /// Open the ICMP socket.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// [`DetectError::ProbeUnavailable`] when the process may not open ICMP
    /// sockets (missing privilege or `ping_group_range` restriction).
    pub fn new() -> Result<Self, DetectError> {
        let client = Client::new(&Config::default()).map_err(|e| DetectError::ProbeUnavailable {
            mechanism: "ICMP".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            next_id: AtomicU16::new(std::process::id() as u16),
        })
    }

    /// Neighbor-table lookup via procfs. `Ok(None)` when the table is
    /// readable but has no complete entry for `addr`.
    async fn read_neighbor_table(
        &self,
        addr: Ipv4Addr,
    ) -> std::io::Result<Option<HardwareAddress>> {
        let table = tokio::fs::read_to_string(NEIGHBOR_TABLE).await?;
        Ok(parse_neighbor_table(&table, addr))
    }

    /// Neighbor-table lookup via the `arp` utility
    async fn query_arp_command(
        &self,
        addr: Ipv4Addr,
    ) -> Result<Option<HardwareAddress>, DetectError> {
        let output = Command::new("arp")
            .arg("-n")
            .arg(addr.to_string())
            .output()
            .await
            .map_err(|e| DetectError::ProbeFailed {
                address: addr,
                mechanism: "neighbor cache".to_string(),
                reason: format!("could not run arp: {}", e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!("arp -n {}: {:?}", addr, stdout);
        Ok(HardwareAddress::find_in(&stdout))
    }
}

/// Find the hardware address for `addr` in `/proc/net/arp` content
pub fn parse_neighbor_table(table: &str, addr: Ipv4Addr) -> Option<HardwareAddress> {
    let wanted = addr.to_string();
    table
        .lines()
        .skip(1)
        .filter(|line| line.split_whitespace().next() == Some(wanted.as_str()))
        .find_map(HardwareAddress::find_in)
}

#[async_trait]
impl HostProbe for SystemProbe {
    async fn is_alive(&self, addr: Ipv4Addr, wait: Duration) -> Result<bool, DetectError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut pinger = self.client.pinger(IpAddr::V4(addr), PingIdentifier(id)).await;
        pinger.timeout(wait);

        match pinger.ping(PingSequence(0), &[0u8; PAYLOAD_LEN]).await {
            Ok((_, rtt)) => {
                trace!("{} answered in {:?}", addr, rtt);
                Ok(true)
            }
            Err(SurgeError::Timeout { .. }) => Ok(false),
            Err(e) => Err(DetectError::ProbeFailed {
                address: addr,
                mechanism: "ICMP".to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn resolve_hardware_address(
        &self,
        addr: Ipv4Addr,
    ) -> Result<Option<HardwareAddress>, DetectError> {
        match self.read_neighbor_table(addr).await {
            Ok(found) => Ok(found),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                debug!("{} unavailable ({}), using arp", NEIGHBOR_TABLE, e);
                self.query_arp_command(addr).await
            }
            Err(e) => Err(DetectError::ProbeFailed {
                address: addr,
                mechanism: "neighbor cache".to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn resolve_hostname(
        &self,
        addr: Ipv4Addr,
        wait: Duration,
    ) -> Result<Option<String>, DetectError> {
        let lookup = tokio::task::spawn_blocking(move || lookup_addr(&IpAddr::V4(addr)));

        match timeout(wait, lookup).await {
            // The resolver echoes the address back when there is no PTR record
            Ok(Ok(Ok(name))) if name != addr.to_string() => Ok(Some(name)),
            Ok(Ok(_)) => Ok(None),
            Ok(Err(e)) => Err(DetectError::ProbeFailed {
                address: addr,
                mechanism: "reverse DNS".to_string(),
                reason: e.to_string(),
            }),
            Err(_) => {
                trace!("reverse lookup of {} timed out", addr);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         aa:bb:cc:00:00:01     *        eth0
192.168.1.10     0x1         0x2         b8:27:eb:12:34:56     *        eth0
192.168.1.11     0x1         0x0         00:00:00:00:00:00     *        eth0
";

    #[test]
    fn test_parse_neighbor_table() {
        let mac = parse_neighbor_table(TABLE, Ipv4Addr::new(192, 168, 1, 10)).unwrap();
        assert_eq!(mac.to_string(), "B8:27:EB:12:34:56");
    }

    #[test]
    fn test_parse_neighbor_table_exact_address() {
        // 192.168.1.1 must not match the 192.168.1.10 / .11 lines
        let mac = parse_neighbor_table(TABLE, Ipv4Addr::new(192, 168, 1, 1)).unwrap();
        assert_eq!(mac.to_string(), "AA:BB:CC:00:00:01");
    }

    #[test]
    fn test_parse_neighbor_table_incomplete_and_missing() {
        assert_eq!(parse_neighbor_table(TABLE, Ipv4Addr::new(192, 168, 1, 11)), None);
        assert_eq!(parse_neighbor_table(TABLE, Ipv4Addr::new(192, 168, 1, 99)), None);
    }
}
