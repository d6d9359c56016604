//! LAN Simulation Library
//!
//! This crate provides a simulated network for exercising sweeps without
//! touching a real LAN. A [`SimulatedNetwork`] implements
//! [`lan_detect::HostProbe`], so it plugs into a `HostProber` in place of
//! the system probe.
//!
//! # Example
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use lan_detect::HostProber;
//! use lan_sim::{SimulatedHost, SimulatedNetwork};
//!
//! let network = SimulatedNetwork::new()
//!     .with_host(
//!         Ipv4Addr::new(192, 168, 1, 1),
//!         SimulatedHost::new()
//!             .with_mac("AA:BB:CC:00:00:01".parse().unwrap())
//!             .with_hostname("router"),
//!     )
//!     .into_shared();
//!
//! let prober = HostProber::new(network.clone());
//! ```

pub mod network;

pub use network::{SimulatedHost, SimulatedNetwork};
