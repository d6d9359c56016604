//! Local Network Detection Library
//!
//! This crate provides the per-host building blocks of a LAN sweep:
//! address-range expansion, liveness/neighbor/reverse-name probing,
//! hardware-address vendor lookup and coarse device classification.
//!
//! # Example
//!
//! ```rust,no_run
//! use lan_detect::{AddressRange, HostProber, SystemProbe, VendorResolver};
//!
//! # async fn run() -> Result<(), lan_detect::DetectError> {
//! let range: AddressRange = "192.168.1.0/24".parse()?;
//! let prober = HostProber::new(SystemProbe::new()?);
//! let vendors = VendorResolver::builtin();
//!
//! for addr in range.hosts()? {
//!     let result = prober.probe(addr).await?;
//!     if let Some(mac) = result.hardware_address {
//!         println!("{} {} {}", addr, mac, vendors.resolve_address(&mac));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod error;
pub mod hwaddr;
pub mod probe;
pub mod range;
pub mod system;
pub mod vendor;

pub use classify::{classify, DeviceType};
pub use error::DetectError;
pub use hwaddr::HardwareAddress;
pub use probe::{HostProbe, HostProber, ProbeConfig, ProbeResult};
pub use range::{AddressRange, DEFAULT_MAX_HOSTS};
pub use system::SystemProbe;
pub use vendor::{VendorResolver, VendorTable, UNKNOWN_VENDOR};
