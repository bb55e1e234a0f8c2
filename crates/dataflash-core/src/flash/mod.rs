//! High-level flash operations
//!
//! [`DataFlash`] owns the Transfer Engine and the device geometry, and turns
//! page, block and byte requests into protocol sequences with the
//! configured ready-wait and power policies applied.

mod device;
mod progress;

pub use device::DataFlash;
pub use progress::{NoProgress, PageProgress};
