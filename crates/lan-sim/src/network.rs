//! Simulated network
//!
//! Hosts are registered up front with the answers they give. Every
//! reachability probe is logged, and the network can cancel a token after a
//! given number of probes to exercise mid-sweep cancellation.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lan_detect::{DetectError, HardwareAddress, HostProbe};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A host on the simulated network
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    /// Entry in the neighbor cache, if any
    pub hardware_address: Option<HardwareAddress>,
    /// Reverse-DNS name, if any
    pub hostname: Option<String>,
    /// How long the reachability probe takes
    pub delay: Duration,
    /// Probing this host fails with a per-host error
    pub fail: bool,
    /// Probing this host panics
    pub panic: bool,
}

impl SimulatedHost {
    /// A live host with no neighbor entry and no name
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mac(mut self, mac: HardwareAddress) -> Self {
        self.hardware_address = Some(mac);
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }
}

/// Cancel `token` when the `after`-th probe starts
#[derive(Debug)]
struct CancelTrigger {
    after: usize,
    token: CancellationToken,
}

/// A network of simulated hosts
#[derive(Debug, Default)]
pub struct SimulatedNetwork {
    hosts: HashMap<Ipv4Addr, SimulatedHost>,
    unavailable: Option<String>,
    cancel_trigger: Option<CancelTrigger>,
    probe_count: AtomicUsize,
    probed: Mutex<Vec<Ipv4Addr>>,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a live host
    pub fn with_host(mut self, addr: Ipv4Addr, host: SimulatedHost) -> Self {
        self.hosts.insert(addr, host);
        self
    }

    /// Make `check_available` fail, as when ICMP sockets are not permitted
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    /// Cancel `token` as soon as the `after`-th reachability probe starts
    pub fn cancel_after(mut self, after: usize, token: CancellationToken) -> Self {
        self.cancel_trigger = Some(CancelTrigger { after, token });
        self
    }

    /// Wrap in an `Arc` so tests can keep a handle after giving one to a prober
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Addresses that received a reachability probe, in ascending order
    pub fn probed(&self) -> Vec<Ipv4Addr> {
        let mut probed = self
            .probed
            .lock()
            .map(|probed| probed.clone())
            .unwrap_or_default();
        probed.sort();
        probed
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    fn host(&self, addr: Ipv4Addr) -> Option<&SimulatedHost> {
        self.hosts.get(&addr)
    }
}

#[async_trait]
impl HostProbe for SimulatedNetwork {
    async fn check_available(&self) -> Result<(), DetectError> {
        match &self.unavailable {
            Some(reason) => Err(DetectError::ProbeUnavailable {
                mechanism: "simulated ICMP".to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn is_alive(&self, addr: Ipv4Addr, _timeout: Duration) -> Result<bool, DetectError> {
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(addr);
        }
        let count = self.probe_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(trigger) = &self.cancel_trigger {
            if count == trigger.after {
                trace!("cancelling after probe {} ({})", count, addr);
                trigger.token.cancel();
            }
        }

        let Some(host) = self.host(addr) else {
            return Ok(false);
        };
        if !host.delay.is_zero() {
            tokio::time::sleep(host.delay).await;
        }
        if host.panic {
            panic!("simulated probe panic for {}", addr);
        }
        if host.fail {
            return Err(DetectError::ProbeFailed {
                address: addr,
                mechanism: "simulated ICMP".to_string(),
                reason: "host unreachable: no route".to_string(),
            });
        }
        Ok(true)
    }

    async fn resolve_hardware_address(
        &self,
        addr: Ipv4Addr,
    ) -> Result<Option<HardwareAddress>, DetectError> {
        Ok(self.host(addr).and_then(|h| h.hardware_address))
    }

    async fn resolve_hostname(
        &self,
        addr: Ipv4Addr,
        _timeout: Duration,
    ) -> Result<Option<String>, DetectError> {
        Ok(self.host(addr).and_then(|h| h.hostname.clone()))
    }
}
