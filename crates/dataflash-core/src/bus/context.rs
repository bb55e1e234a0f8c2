//! Transfer descriptor and its state machine

use heapless::Vec;

use super::MAX_TRANSFER_LEN;
use crate::error::{Error, Result};
use crate::spi::{opcodes, CommandFrame, MAX_HEADER_LEN};

/// Phase of the transfer currently on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// No transfer in flight; a new one may be started
    #[default]
    Idle,
    /// Shifting opcode, address and don't-care bytes
    SendingCommandBytes,
    /// Shifting payload bytes of a write
    SendingDataBytes,
    /// Shifting filler bytes and capturing the response of a read
    ReceivingDataBytes,
}

/// Input to the transfer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Foreground asks to start the loaded transfer
    Start,
    /// Byte-complete interrupt; carries the byte clocked in
    ByteShifted(u8),
}

/// What the bus has to do after a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Load this byte into the transmit register
    Shift(u8),
    /// Transfer complete: wake the foreground
    Release,
    /// Nothing to do (spurious interrupt)
    None,
}

/// Live state of one exchange plus the buffers it shifts from and into
///
/// The foreground owns the context while it is [`TransferMode::Idle`]; once
/// a transfer is started only [`on_byte_shifted`](Self::on_byte_shifted)
/// advances it. Both sides take `&mut self`, so the two can never touch
/// the buffers at the same time.
#[derive(Debug)]
pub struct TransferContext<const N: usize = MAX_TRANSFER_LEN> {
    mode: TransferMode,
    command_byte: u8,
    /// Frame bytes after the opcode still belonging to the command phase
    header_remaining: usize,
    tx: Vec<u8, N>,
    tx_cursor: usize,
    tx_remaining: usize,
    rx: Vec<u8, N>,
    rx_cursor: usize,
    rx_remaining: usize,
}

impl<const N: usize> Default for TransferContext<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TransferContext<N> {
    /// Create an idle context with empty buffers
    pub const fn new() -> Self {
        Self {
            mode: TransferMode::Idle,
            command_byte: 0,
            header_remaining: 0,
            tx: Vec::new(),
            tx_cursor: 0,
            tx_remaining: 0,
            rx: Vec::new(),
            rx_cursor: 0,
            rx_remaining: 0,
        }
    }

    /// Current transfer phase
    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Returns true if no transfer is in flight
    pub fn is_idle(&self) -> bool {
        self.mode == TransferMode::Idle
    }

    /// Capacity of the transmit and receive buffers
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes captured by the last read transfer
    pub fn response(&self) -> &[u8] {
        &self.rx[..self.rx_cursor]
    }

    /// Load `frame` and start shifting it
    ///
    /// `response_len` is the number of bytes to capture after the frame
    /// (zero for a write). For a read, the whole frame counts as command
    /// bytes; for a write, only opcode, address and don't-care bytes do and
    /// the rest goes out in the data phase.
    ///
    /// Returns the first action for the bus, which is always the opcode.
    pub fn begin(&mut self, frame: &CommandFrame<'_>, response_len: usize) -> Result<Action> {
        if !self.is_idle() {
            return Err(Error::TransferInProgress);
        }
        if frame.header_len() > MAX_HEADER_LEN
            || frame.total_len() - 1 > N
            || response_len > N
        {
            return Err(Error::FrameTooLong);
        }

        let mut header = [0u8; MAX_HEADER_LEN];
        let header_len = frame.encode_header(&mut header);

        self.tx.clear();
        self.rx.clear();
        // Both fit: checked against N above
        let _ = self.tx.extend_from_slice(&header[1..header_len]);
        let _ = self.tx.extend_from_slice(frame.payload);
        let _ = self.rx.resize(response_len, 0);

        self.command_byte = header[0];
        self.tx_cursor = 0;
        self.tx_remaining = self.tx.len();
        self.header_remaining = if response_len > 0 {
            self.tx.len()
        } else {
            header_len - 1
        };
        self.rx_cursor = 0;
        self.rx_remaining = response_len;

        log::trace!(
            "transfer start: opcode 0x{:02X}, {} tx bytes, {} rx bytes",
            self.command_byte,
            self.tx_remaining,
            response_len
        );

        self.step(Event::Start)
    }

    /// Interrupt-side entry point: the last loaded byte has been shifted
    pub fn on_byte_shifted(&mut self, received: u8) -> Action {
        // ByteShifted is accepted in every mode
        self.step(Event::ByteShifted(received))
            .unwrap_or(Action::None)
    }

    /// Drop an in-flight transfer and return to idle
    pub fn abort(&mut self) {
        if !self.is_idle() {
            log::debug!(
                "transfer 0x{:02X} aborted in {:?}",
                self.command_byte,
                self.mode
            );
        }
        self.mode = TransferMode::Idle;
        self.tx_remaining = 0;
        self.rx_remaining = 0;
        self.header_remaining = 0;
    }

    /// State-transition function
    ///
    /// Every (mode, event) pair is handled explicitly. `Start` is only
    /// accepted from `Idle`; `ByteShifted` while idle is a spurious
    /// interrupt and ignored.
    pub fn step(&mut self, event: Event) -> Result<Action> {
        match (self.mode, event) {
            (TransferMode::Idle, Event::Start) => {
                self.mode = TransferMode::SendingCommandBytes;
                Ok(Action::Shift(self.command_byte))
            }
            (TransferMode::Idle, Event::ByteShifted(_)) => {
                log::trace!("spurious byte-shifted interrupt while idle");
                Ok(Action::None)
            }
            (
                TransferMode::SendingCommandBytes
                | TransferMode::SendingDataBytes
                | TransferMode::ReceivingDataBytes,
                Event::Start,
            ) => Err(Error::TransferInProgress),
            (TransferMode::SendingCommandBytes, Event::ByteShifted(_)) => Ok(self.command_phase()),
            (TransferMode::SendingDataBytes, Event::ByteShifted(_)) => Ok(self.data_phase()),
            (TransferMode::ReceivingDataBytes, Event::ByteShifted(received)) => {
                Ok(self.receive_phase(received))
            }
        }
    }

    fn command_phase(&mut self) -> Action {
        if self.header_remaining > 0 {
            self.header_remaining -= 1;
            return self.shift_next_tx();
        }

        if self.rx_remaining > 0 {
            self.mode = TransferMode::ReceivingDataBytes;
            Action::Shift(opcodes::FILLER)
        } else if self.tx_remaining > 0 {
            self.mode = TransferMode::SendingDataBytes;
            self.shift_next_tx()
        } else {
            self.finish()
        }
    }

    fn data_phase(&mut self) -> Action {
        if self.tx_remaining > 0 {
            self.shift_next_tx()
        } else {
            self.finish()
        }
    }

    fn receive_phase(&mut self, received: u8) -> Action {
        if self.rx_remaining > 0 {
            self.rx[self.rx_cursor] = received;
            self.rx_cursor += 1;
            self.rx_remaining -= 1;
        }

        if self.rx_remaining == 0 {
            self.finish()
        } else {
            Action::Shift(opcodes::FILLER)
        }
    }

    fn shift_next_tx(&mut self) -> Action {
        let byte = self.tx[self.tx_cursor];
        self.tx_cursor += 1;
        self.tx_remaining -= 1;
        Action::Shift(byte)
    }

    fn finish(&mut self) -> Action {
        self.mode = TransferMode::Idle;
        Action::Release
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;

    /// Feed interrupts until the context releases, recording every byte shifted
    fn run<const N: usize>(ctx: &mut TransferContext<N>, first: Action, miso: &[u8]) -> [u8; 64] {
        let mut wire = [0u8; 64];
        let mut count = 0;
        let mut action = first;
        let mut i = 0;
        while let Action::Shift(byte) = action {
            wire[count] = byte;
            count += 1;
            let received = miso.get(i).copied().unwrap_or(0);
            i += 1;
            action = ctx.on_byte_shifted(received);
        }
        assert_eq!(action, Action::Release);
        wire
    }

    #[test]
    fn test_write_walks_command_then_data_phase() {
        let mut ctx: TransferContext<32> = TransferContext::new();
        let data = [0xA1, 0xA2];
        let frame = CommandFrame::write_3b(opcodes::WRBF1, 0x000010, &data);

        assert_eq!(ctx.begin(&frame, 0).unwrap(), Action::Shift(0x84));
        assert_eq!(ctx.mode(), TransferMode::SendingCommandBytes);

        // Three address bytes stay in the command phase
        assert_eq!(ctx.on_byte_shifted(0), Action::Shift(0x00));
        assert_eq!(ctx.on_byte_shifted(0), Action::Shift(0x00));
        assert_eq!(ctx.on_byte_shifted(0), Action::Shift(0x10));
        assert_eq!(ctx.mode(), TransferMode::SendingCommandBytes);

        assert_eq!(ctx.on_byte_shifted(0), Action::Shift(0xA1));
        assert_eq!(ctx.mode(), TransferMode::SendingDataBytes);
        assert_eq!(ctx.on_byte_shifted(0), Action::Shift(0xA2));
        assert_eq!(ctx.on_byte_shifted(0), Action::Release);
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_read_captures_response_after_frame() {
        let mut ctx: TransferContext<32> = TransferContext::new();
        let frame = CommandFrame::simple(opcodes::RDDEVID);
        let first = ctx.begin(&frame, 3).unwrap();

        // MISO: junk during the opcode, then three ID bytes
        let wire = run(&mut ctx, first, &[0xEE, 0x1F, 0x24, 0x00]);
        assert_eq!(&wire[..4], &[0x9F, 0xFF, 0xFF, 0xFF]);
        assert_eq!(ctx.response(), &[0x1F, 0x24, 0x00]);
    }

    #[test]
    fn test_read_with_dummy_byte_keeps_whole_frame_in_command_phase() {
        let mut ctx: TransferContext<32> = TransferContext::new();
        let frame = CommandFrame::read_hf(opcodes::RDARRAYHF, 0x000100);
        let first = ctx.begin(&frame, 2).unwrap();
        let wire = run(&mut ctx, first, &[0, 0, 0, 0, 0, 0x11, 0x22]);
        assert_eq!(&wire[..7], &[0x0B, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(ctx.response(), &[0x11, 0x22]);
    }

    #[test]
    fn test_single_opcode_write_releases_after_one_byte() {
        let mut ctx: TransferContext<8> = TransferContext::new();
        let frame = CommandFrame::simple(opcodes::PWRDOWN);
        assert_eq!(ctx.begin(&frame, 0).unwrap(), Action::Shift(0xB9));
        assert_eq!(ctx.on_byte_shifted(0), Action::Release);
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_start_refused_while_in_flight() {
        let mut ctx: TransferContext<8> = TransferContext::new();
        let frame = CommandFrame::addressed(opcodes::PGERASE, 0);
        ctx.begin(&frame, 0).unwrap();

        let other = CommandFrame::simple(opcodes::RDSR);
        assert_eq!(ctx.begin(&other, 1), Err(Error::TransferInProgress));
        // The in-flight transfer carries on untouched
        assert_eq!(ctx.mode(), TransferMode::SendingCommandBytes);
        assert_eq!(ctx.on_byte_shifted(0), Action::Shift(0x00));
    }

    #[test]
    fn test_start_event_rejected_in_every_busy_mode() {
        let mut ctx: TransferContext<8> = TransferContext::new();
        let data = [1u8];
        let frame = CommandFrame::write_3b(opcodes::WRBF1, 0, &data);
        ctx.begin(&frame, 0).unwrap();
        assert_eq!(ctx.step(Event::Start), Err(Error::TransferInProgress));
        for _ in 0..3 {
            ctx.on_byte_shifted(0);
        }
        ctx.on_byte_shifted(0);
        assert_eq!(ctx.mode(), TransferMode::SendingDataBytes);
        assert_eq!(ctx.step(Event::Start), Err(Error::TransferInProgress));

        let mut ctx: TransferContext<8> = TransferContext::new();
        ctx.begin(&CommandFrame::simple(opcodes::RDSR), 2).unwrap();
        ctx.on_byte_shifted(0);
        assert_eq!(ctx.mode(), TransferMode::ReceivingDataBytes);
        assert_eq!(ctx.step(Event::Start), Err(Error::TransferInProgress));
    }

    #[test]
    fn test_spurious_interrupt_when_idle() {
        let mut ctx: TransferContext<8> = TransferContext::new();
        assert_eq!(ctx.on_byte_shifted(0x55), Action::None);
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_modes_only_advance_forward() {
        // Record every mode seen across a full read; the sequence must be
        // Idle -> Command -> Receiving -> Idle with no re-entry
        let mut ctx: TransferContext<16> = TransferContext::new();
        let frame = CommandFrame::read_hf(opcodes::RDBF1, 0);
        let mut action = ctx.begin(&frame, 4).unwrap();
        let mut last = ctx.mode();
        assert_eq!(last, TransferMode::SendingCommandBytes);
        while let Action::Shift(_) = action {
            action = ctx.on_byte_shifted(0);
            let now = ctx.mode();
            let allowed = matches!(
                (last, now),
                (TransferMode::SendingCommandBytes, TransferMode::SendingCommandBytes)
                    | (TransferMode::SendingCommandBytes, TransferMode::ReceivingDataBytes)
                    | (TransferMode::ReceivingDataBytes, TransferMode::ReceivingDataBytes)
                    | (TransferMode::ReceivingDataBytes, TransferMode::Idle)
            );
            assert!(allowed, "illegal transition {:?} -> {:?}", last, now);
            last = now;
        }
        assert_eq!(last, TransferMode::Idle);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut ctx: TransferContext<8> = TransferContext::new();
        let data = [0u8; 8];
        let frame = CommandFrame::write_3b(opcodes::WRBF1, 0, &data);
        assert_eq!(ctx.begin(&frame, 0), Err(Error::FrameTooLong));
        assert_eq!(
            ctx.begin(&CommandFrame::simple(opcodes::RDSR), 9),
            Err(Error::FrameTooLong)
        );
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_overlong_header_rejected() {
        let mut ctx: TransferContext<32> = TransferContext::new();
        let frame = CommandFrame::addressed(opcodes::RDARRAYHF, 0).with_dummy_bytes(2);
        assert_eq!(frame.header_len(), MAX_HEADER_LEN + 1);
        assert_eq!(ctx.begin(&frame, 4), Err(Error::FrameTooLong));
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_abort_returns_to_idle() {
        let mut ctx: TransferContext<8> = TransferContext::new();
        ctx.begin(&CommandFrame::simple(opcodes::RDSR), 1).unwrap();
        ctx.abort();
        assert!(ctx.is_idle());
        assert!(ctx.begin(&CommandFrame::simple(opcodes::RDSR), 1).is_ok());
    }
}
