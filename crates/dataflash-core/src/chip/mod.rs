//! DataFlash identification, geometry and status types
//!
//! This module describes what the driver learns from the device: its
//! identification bytes, the page geometry they imply, and the status
//! register flags.

mod geometry;
mod id;
mod status;

pub use geometry::{Density, Geometry, ParseDensityError};
pub use id::DeviceId;
pub use status::Status;
