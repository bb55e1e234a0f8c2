//! Protocol implementations
//!
//! This module contains the AT45DB DataFlash command sequences, each one a
//! complete chip-select window on top of the Transfer Engine.

mod dataflash;

pub use dataflash::*;
