//! Error types for dataflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Identification errors
    /// Identification bytes don't match a known manufacturer, family or capacity
    UnrecognizedDevice,
    /// Device is configured for legacy (264/528/1056-byte) pages
    ///
    /// The binary page size sequence has been sent; the part needs a power
    /// cycle before it can be initialized again.
    LegacyPageFormat,

    // Transfer errors
    /// Device or bus did not complete within the configured wait policy
    Timeout,
    /// A transfer was started while another one is still in flight
    TransferInProgress,
    /// Command frame does not fit in the transfer buffers
    FrameTooLong,

    // Address/size errors
    /// Provided buffer is too small for the operation
    BufferTooSmall,
    /// Page, block or byte range is beyond the device size
    AddressOutOfBounds,
    /// Operation needs the device geometry, but identification has not succeeded
    NotInitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedDevice => write!(f, "unrecognized DataFlash device"),
            Self::LegacyPageFormat => write!(
                f,
                "device uses legacy page size; reprogrammed, power cycle required"
            ),
            Self::Timeout => write!(f, "operation timed out"),
            Self::TransferInProgress => write!(f, "transfer already in progress"),
            Self::FrameTooLong => write!(f, "command frame exceeds transfer buffer"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::NotInitialized => write!(f, "device geometry unknown (not initialized)"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
