//! Interrupt-driven Transfer Engine
//!
//! A transfer is one full-duplex exchange: a command frame goes out one
//! byte at a time and, for reads, a response comes back one byte at a time.
//! Only one byte is ever in flight. After each byte the bus peripheral
//! raises a "byte shifted" interrupt, and the interrupt side of the engine
//! decides what to load next.
//!
//! The pieces are:
//!
//! - [`SerialBus`] - the hardware seam (shift register, chip select, delay)
//! - [`TransferContext`] - the live transfer descriptor plus the transmit
//!   and receive buffers, advanced by an explicit state-transition function
//! - [`TransferEngine`] - the foreground side: starts a transfer, sleeps
//!   until each interrupt and feeds it to the context
//!
//! Firmware that services the interrupt in a real ISR can drive a
//! [`TransferContext`] directly: call [`TransferContext::begin`] from the
//! foreground, and [`TransferContext::on_byte_shifted`] from the handler.

mod context;
mod engine;

pub use context::{Action, Event, TransferContext, TransferMode};
pub use engine::TransferEngine;

use crate::error::Result;

/// Default transmit/receive buffer capacity
///
/// Opcode + 3 address bytes + a 1024-byte page, plus slack for the
/// don't-care bytes of the read commands.
pub const MAX_TRANSFER_LEN: usize = 4 + 1024 + 4;

/// Byte-synchronous serial bus peripheral
///
/// This trait represents the shift-register peripheral the Transfer Engine
/// drives. Implementations own the hardware (or an emulation of it).
///
/// The engine only ever has one byte in flight: it calls
/// [`load_tx`](Self::load_tx), then [`wait_for_shift`](Self::wait_for_shift),
/// which parks the caller in a low-power wait until the byte-complete
/// interrupt fires and returns the byte clocked in at the same time.
pub trait SerialBus {
    /// Drive the chip select line (CS is active low, so `active=true` means CS=0)
    fn set_cs(&mut self, active: bool);

    /// Place a byte in the transmit register, starting its shift
    fn load_tx(&mut self, byte: u8);

    /// Sleep until the byte-shifted interrupt fires
    ///
    /// Returns the byte received while the last loaded byte was shifted
    /// out. Implementations must bound the wait and return
    /// [`Error::Timeout`](crate::Error::Timeout) when the interrupt never
    /// arrives.
    fn wait_for_shift(&mut self) -> Result<u8>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<B: SerialBus + ?Sized> SerialBus for &mut B {
    fn set_cs(&mut self, active: bool) {
        (**self).set_cs(active)
    }

    fn load_tx(&mut self, byte: u8) {
        (**self).load_tx(byte)
    }

    fn wait_for_shift(&mut self) -> Result<u8> {
        (**self).wait_for_shift()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
