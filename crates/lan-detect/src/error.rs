//! Error types for LAN detection

use std::net::Ipv4Addr;

use thiserror::Error;

/// Errors that can occur during detection
#[derive(Debug, Error)]
pub enum DetectError {
    /// Address range could not be parsed or expanded
    #[error("invalid address range {range}: {reason}")]
    InvalidRange { range: String, reason: String },

    /// Hardware address text could not be parsed
    #[error("invalid hardware address: {0}")]
    InvalidHardwareAddress(String),

    /// A probing mechanism cannot be used at all (missing privilege, no socket support)
    #[error("{mechanism} probing unavailable: {reason}")]
    ProbeUnavailable { mechanism: String, reason: String },

    /// A probing mechanism failed for one host
    #[error("{mechanism} probe of {address} failed: {reason}")]
    ProbeFailed {
        address: Ipv4Addr,
        mechanism: String,
        reason: String,
    },

    /// I/O error while reading local system state
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectError {
    /// Whether the error concerns a single host rather than the whole sweep
    pub fn is_per_host(&self) -> bool {
        matches!(self, DetectError::ProbeFailed { .. })
    }
}
