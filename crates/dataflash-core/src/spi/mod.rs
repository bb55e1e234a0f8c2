//! Command frame types and DataFlash opcodes
//!
//! This module provides the types used to describe one bus transaction
//! (opcode, address, filler and payload bytes) and the AT45DB opcode set.

mod address;
mod frame;
pub mod opcodes;

pub use address::AddressWidth;
pub use frame::{CommandFrame, MAX_HEADER_LEN};
pub use opcodes::*;
