//! dataflash-sim - AT45DB DataFlash emulator for testing
//!
//! This crate provides an emulated AT45DB part ([`SimFlash`]) and a
//! simulated shift-register peripheral ([`SimBus`]) that delivers one
//! "byte shifted" interrupt per byte. Together they let the Transfer Engine
//! and the command layer run unchanged without hardware.
//!
//! ```ignore
//! use dataflash_core::{config::DriverConfig, flash::DataFlash};
//! use dataflash_sim::{SimBus, SimConfig, SimFlash};
//!
//! let bus = SimBus::new(SimFlash::new(SimConfig::default()));
//! let mut flash = DataFlash::new(bus, DriverConfig::default());
//! flash.initialize()?;
//! ```

mod bus;
mod device;
mod error;

pub use bus::SimBus;
pub use device::{CommandRecord, SimConfig, SimFlash};
pub use error::{ImageError, Result};
