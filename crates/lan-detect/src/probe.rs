//! Per-host probing
//!
//! A probe answers three questions about one address: is it reachable, what
//! hardware address does the local neighbor cache hold for it, and what is
//! its reverse-DNS name. Missing answers are normal outcomes and come back
//! as `false` / `None`; only an unusable mechanism is an error.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::DetectError;
use crate::hwaddr::HardwareAddress;

/// Platform probing capability
///
/// Implemented by [`crate::SystemProbe`] for real networks and by simulated
/// networks in tests.
#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Verify the mechanisms can be used at all. Called once before a sweep.
    async fn check_available(&self) -> Result<(), DetectError> {
        Ok(())
    }

    /// Send one reachability probe and wait at most `timeout` for a reply
    async fn is_alive(&self, addr: Ipv4Addr, timeout: Duration) -> Result<bool, DetectError>;

    /// Look the address up in the local neighbor cache
    async fn resolve_hardware_address(
        &self,
        addr: Ipv4Addr,
    ) -> Result<Option<HardwareAddress>, DetectError>;

    /// Reverse name lookup bounded by `timeout`
    async fn resolve_hostname(
        &self,
        addr: Ipv4Addr,
        timeout: Duration,
    ) -> Result<Option<String>, DetectError>;
}

#[async_trait]
impl<P: HostProbe + ?Sized> HostProbe for Arc<P> {
    async fn check_available(&self) -> Result<(), DetectError> {
        (**self).check_available().await
    }

    async fn is_alive(&self, addr: Ipv4Addr, timeout: Duration) -> Result<bool, DetectError> {
        (**self).is_alive(addr, timeout).await
    }

    async fn resolve_hardware_address(
        &self,
        addr: Ipv4Addr,
    ) -> Result<Option<HardwareAddress>, DetectError> {
        (**self).resolve_hardware_address(addr).await
    }

    async fn resolve_hostname(
        &self,
        addr: Ipv4Addr,
        timeout: Duration,
    ) -> Result<Option<String>, DetectError> {
        (**self).resolve_hostname(addr, timeout).await
    }
}

/// Result of probing one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub alive: bool,
    pub hardware_address: Option<HardwareAddress>,
    pub hostname: Option<String>,
}

impl ProbeResult {
    /// Result for an address that did not answer
    pub fn unreachable() -> Self {
        Self {
            alive: false,
            hardware_address: None,
            hostname: None,
        }
    }
}

/// Configuration for probing
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for the reachability probe
    pub timeout: Duration,
    /// Timeout for the reverse name lookup
    pub name_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            name_timeout: Duration::from_millis(2000),
        }
    }
}

/// Host prober
#[derive(Clone)]
pub struct HostProber {
    config: ProbeConfig,
    backend: Arc<dyn HostProbe>,
}

impl HostProber {
    /// Create a prober with default configuration
    pub fn new<P: HostProbe + 'static>(backend: P) -> Self {
        Self::with_config(backend, ProbeConfig::default())
    }

    /// Create a prober with custom configuration
    pub fn with_config<P: HostProbe + 'static>(backend: P, config: ProbeConfig) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Check that the backend can probe at all
    pub async fn check_available(&self) -> Result<(), DetectError> {
        self.backend.check_available().await
    }

    /// Probe a single address
    pub async fn probe(&self, addr: Ipv4Addr) -> Result<ProbeResult, DetectError> {
        if !self.backend.is_alive(addr, self.config.timeout).await? {
            trace!("{} did not answer", addr);
            return Ok(ProbeResult::unreachable());
        }

        let hardware_address = self.backend.resolve_hardware_address(addr).await?;
        let hostname = self
            .backend
            .resolve_hostname(addr, self.config.name_timeout)
            .await?;

        debug!(
            "{} is alive (mac: {}, hostname: {})",
            addr,
            hardware_address
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            hostname.as_deref().unwrap_or("-")
        );

        Ok(ProbeResult {
            alive: true,
            hardware_address,
            hostname,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers for .1 only and counts resolution calls
    #[derive(Default)]
    struct OneHost {
        resolutions: AtomicUsize,
    }

    #[async_trait]
    impl HostProbe for OneHost {
        async fn is_alive(&self, addr: Ipv4Addr, _: Duration) -> Result<bool, DetectError> {
            Ok(addr.octets()[3] == 1)
        }

        async fn resolve_hardware_address(
            &self,
            _: Ipv4Addr,
        ) -> Result<Option<HardwareAddress>, DetectError> {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            Ok(Some(HardwareAddress::new([0xB8, 0x27, 0xEB, 0, 0, 1])))
        }

        async fn resolve_hostname(
            &self,
            _: Ipv4Addr,
            _: Duration,
        ) -> Result<Option<String>, DetectError> {
            Ok(None)
        }
    }

    #[test]
    fn test_probe_config_default() {
        let config = ProbeConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.name_timeout, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_dead_host_skips_resolution() {
        let backend = Arc::new(OneHost::default());
        let prober = HostProber::new(backend.clone());

        let result = prober.probe(Ipv4Addr::new(10, 0, 0, 2)).await.unwrap();
        assert_eq!(result, ProbeResult::unreachable());
        assert_eq!(backend.resolutions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_alive_host_resolved() {
        let prober = HostProber::new(OneHost::default());
        let result = prober.probe(Ipv4Addr::new(10, 0, 0, 1)).await.unwrap();
        assert!(result.alive);
        assert_eq!(
            result.hardware_address.unwrap().to_string(),
            "B8:27:EB:00:00:01"
        );
        assert_eq!(result.hostname, None);
    }
}
