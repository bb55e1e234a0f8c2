//! Foreground side of the Transfer Engine

use super::{Action, SerialBus, TransferContext, MAX_TRANSFER_LEN};
use crate::error::{Error, Result};
use crate::spi::CommandFrame;

/// Blocking, interrupt-paced transfers over a [`SerialBus`]
///
/// Owns the bus peripheral and the [`TransferContext`]. Each call starts a
/// transfer, then alternates between sleeping in
/// [`SerialBus::wait_for_shift`] and running the interrupt-side step of the
/// state machine until the context releases the foreground.
///
/// Chip select is not touched here; the caller addresses the device first.
pub struct TransferEngine<B, const N: usize = MAX_TRANSFER_LEN> {
    bus: B,
    ctx: TransferContext<N>,
}

impl<B: SerialBus, const N: usize> TransferEngine<B, N> {
    /// Create an engine around a bus peripheral
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            ctx: TransferContext::new(),
        }
    }

    /// Get a reference to the bus peripheral
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Get a mutable reference to the bus peripheral
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consume the engine and return the bus peripheral
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Get a reference to the transfer context
    pub fn context(&self) -> &TransferContext<N> {
        &self.ctx
    }

    /// Largest response a single [`read`](Self::read) can capture
    pub fn max_response_len(&self) -> usize {
        N
    }

    /// Largest number of frame bytes after the opcode a single transfer can carry
    pub fn max_frame_tail_len(&self) -> usize {
        N
    }

    /// Shift out `frame`; blocks until the last byte has gone
    pub fn write(&mut self, frame: &CommandFrame<'_>) -> Result<()> {
        self.transfer(frame, 0)
    }

    /// Shift out `frame`, then clock in `response.len()` bytes
    pub fn read(&mut self, frame: &CommandFrame<'_>, response: &mut [u8]) -> Result<()> {
        if response.len() > N {
            return Err(Error::FrameTooLong);
        }
        self.transfer(frame, response.len())?;
        response.copy_from_slice(self.ctx.response());
        Ok(())
    }

    fn transfer(&mut self, frame: &CommandFrame<'_>, response_len: usize) -> Result<()> {
        let mut action = self.ctx.begin(frame, response_len)?;

        loop {
            match action {
                Action::Shift(byte) => self.bus.load_tx(byte),
                Action::Release => return Ok(()),
                Action::None => {}
            }

            let received = match self.bus.wait_for_shift() {
                Ok(byte) => byte,
                Err(e) => {
                    self.ctx.abort();
                    return Err(e);
                }
            };
            action = self.ctx.on_byte_shifted(received);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::TransferMode;
    use crate::spi::opcodes;

    /// Loopback bus: echoes each transmitted byte back, records the wire
    struct Loopback {
        wire: heapless::Vec<u8, 64>,
        pending: Option<u8>,
        fail_after: Option<usize>,
    }

    impl Loopback {
        fn new() -> Self {
            Self {
                wire: heapless::Vec::new(),
                pending: None,
                fail_after: None,
            }
        }
    }

    impl SerialBus for Loopback {
        fn set_cs(&mut self, _active: bool) {}

        fn load_tx(&mut self, byte: u8) {
            self.wire.push(byte).unwrap();
            self.pending = Some(byte);
        }

        fn wait_for_shift(&mut self) -> Result<u8> {
            if let Some(limit) = self.fail_after {
                if self.wire.len() > limit {
                    return Err(Error::Timeout);
                }
            }
            self.pending.take().ok_or(Error::Timeout)
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    #[test]
    fn test_write_puts_whole_frame_on_wire() {
        let mut engine: TransferEngine<_, 32> = TransferEngine::new(Loopback::new());
        let data = [0x31, 0x32];
        engine
            .write(&CommandFrame::write_3b(opcodes::WRBF1, 0x000002, &data))
            .unwrap();
        assert_eq!(&engine.bus().wire[..], &[0x84, 0x00, 0x00, 0x02, 0x31, 0x32]);
        assert!(engine.context().is_idle());
    }

    #[test]
    fn test_read_returns_bytes_clocked_in() {
        let mut engine: TransferEngine<_, 32> = TransferEngine::new(Loopback::new());
        let mut response = [0u8; 2];
        engine
            .read(&CommandFrame::simple(opcodes::RDSR), &mut response)
            .unwrap();
        // Loopback echoes the filler bytes
        assert_eq!(response, [0xFF, 0xFF]);
        assert_eq!(&engine.bus().wire[..], &[0xD7, 0xFF, 0xFF]);
    }

    #[test]
    fn test_bus_timeout_aborts_transfer() {
        let mut bus = Loopback::new();
        bus.fail_after = Some(2);
        let mut engine: TransferEngine<_, 32> = TransferEngine::new(bus);
        let result = engine.write(&CommandFrame::addressed(opcodes::PGERASE, 0x100));
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(engine.context().mode(), TransferMode::Idle);

        // The engine is usable again
        engine.bus_mut().fail_after = None;
        engine.bus_mut().wire.clear();
        engine.write(&CommandFrame::simple(opcodes::PWRDOWN)).unwrap();
        assert_eq!(&engine.bus().wire[..], &[0xB9]);
    }

    #[test]
    fn test_response_longer_than_buffer_rejected() {
        let mut engine: TransferEngine<_, 4> = TransferEngine::new(Loopback::new());
        let mut response = [0u8; 5];
        assert_eq!(
            engine.read(&CommandFrame::simple(opcodes::RDSR), &mut response),
            Err(Error::FrameTooLong)
        );
        assert!(engine.bus().wire.is_empty());
    }
}
