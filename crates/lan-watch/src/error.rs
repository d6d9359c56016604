//! Error types for sweeps and the device ledger

use std::net::Ipv4Addr;
use std::path::PathBuf;

use lan_detect::DetectError;
use thiserror::Error;

/// Errors raised by ledger storage
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Store could not be read or written
    #[error("ledger I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store content is not a valid ledger
    #[error("ledger {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Ledger could not be serialized
    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that can occur while watching a network
#[derive(Debug, Error)]
pub enum WatchError {
    /// The sweep could not start
    #[error("sweep aborted: {0}")]
    Sweep(#[from] DetectError),

    /// Ledger storage failed
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A device without a hardware address cannot be keyed in the ledger
    #[error("cannot accept {address}: no hardware address")]
    MissingHardwareAddress { address: Ipv4Addr },
}
