//! Error types for SR-IOV device management.
//!
//! All errors use `thiserror` and carry the PCI address they concern, so a
//! failure deep inside a rebind or a provisioning write can be traced back
//! to the device without extra context.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for SR-IOV operations.
pub type Result<T> = std::result::Result<T, SriovError>;

/// Step of a driver rebind that failed.
///
/// A failure after `Unbind` leaves the device without a driver; callers
/// must inspect this rather than assume the old binding is still in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStage {
    Unbind,
    Override,
    Bind,
}

impl std::fmt::Display for BindStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            BindStage::Unbind => "unbind",
            BindStage::Override => "driver_override",
            BindStage::Bind => "bind",
        };
        f.write_str(stage)
    }
}

/// Main error type for SR-IOV device management.
#[derive(Error, Debug)]
pub enum SriovError {
    // Lookup errors
    #[error("{resource} not found for {address}")]
    NotFound { address: String, resource: &'static str },

    #[error("Invalid PCI address format: {address} (expected: 0000:01:00.0)")]
    InvalidAddress { address: String },

    // Host file errors
    #[error("I/O error for {address} at {path:?}: {source}")]
    Io {
        address: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected content {content:?} for {address} at {path:?}")]
    Parse { address: String, path: PathBuf, content: String },

    #[error("Failed to resolve {path:?} for {address}: {reason}")]
    Resolution { address: String, path: PathBuf, reason: String },

    // Driver binding errors
    #[error("Failed to bind {address} to {driver} ({stage} step): {source}")]
    BindFailure {
        address: String,
        driver: String,
        stage: BindStage,
        /// Driver the device was already unbound from when the failure hit.
        previous: Option<String>,
        #[source]
        source: std::io::Error,
    },

    // Provisioning errors
    #[error(
        "Device {address} already has {configured} virtual functions; \
         reset to 0 before requesting {requested}"
    )]
    AlreadyProvisioned { address: String, configured: u32, requested: u32 },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl SriovError {
    /// PCI address the error concerns, if any.
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::NotFound { address, .. }
            | Self::InvalidAddress { address }
            | Self::Io { address, .. }
            | Self::Parse { address, .. }
            | Self::Resolution { address, .. }
            | Self::BindFailure { address, .. }
            | Self::AlreadyProvisioned { address, .. } => Some(address),
            Self::InvalidConfig { .. } => None,
        }
    }
}
