//! dataflash-core - Driver stack for AT45DB-family serial DataFlash
//!
//! This crate provides the two layers needed to talk to a DataFlash part
//! over a byte-synchronous serial bus whose transfers are pumped by an
//! interrupt handler:
//!
//! - [`bus`] - the Transfer Engine, a byte-at-a-time state machine that
//!   shifts a command frame out and a response in while the foreground
//!   sleeps in a low-power wait
//! - [`protocol`] and [`flash`] - the Flash Command Layer, which builds
//!   device opcodes and sequences them with ready/busy polling
//!
//! It is designed to be `no_std` compatible for use in firmware.
//!
//! # Features
//!
//! - `std` - Enable standard library support (serde and TOML loading of
//!   [`config::DriverConfig`])
//!
//! # Example
//!
//! ```ignore
//! use dataflash_core::{config::DriverConfig, flash::DataFlash};
//!
//! fn bring_up<B: dataflash_core::bus::SerialBus>(bus: B) {
//!     let mut flash = DataFlash::new(bus, DriverConfig::default());
//!     match flash.initialize() {
//!         Ok(geometry) => log::info!("{} pages of {} bytes", geometry.page_count, geometry.page_size()),
//!         Err(e) => log::error!("DataFlash init failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod bus;
pub mod chip;
pub mod config;
pub mod error;
pub mod flash;
pub mod protocol;
pub mod spi;

pub use error::{Error, Result};
