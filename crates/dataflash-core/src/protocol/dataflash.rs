//! AT45DB DataFlash command sequences
//!
//! Every function here is one or more complete transactions: chip select is
//! asserted, the frame goes through the Transfer Engine, and chip select is
//! released again whether the transfer succeeded or not.
//!
//! Addresses are byte addresses in the binary (power-of-two) page layout.
//! Converting page or block numbers is left to [`crate::flash::DataFlash`].

use crate::bus::{SerialBus, TransferEngine};
use crate::chip::{DeviceId, Status};
use crate::config::WaitPolicy;
use crate::error::{Error, Result};
use crate::spi::{opcodes, AddressWidth, CommandFrame};

/// Run `f` with the device selected
///
/// Chip select is released on every exit path.
pub fn transaction<T, B, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    f: impl FnOnce(&mut TransferEngine<B, N>) -> Result<T>,
) -> Result<T>
where
    B: SerialBus,
{
    engine.bus_mut().set_cs(true);
    let result = f(engine);
    engine.bus_mut().set_cs(false);
    result
}

/// Release chip select without sending anything
///
/// Puts the device's serial interface into a known state after reset.
pub fn deselect<B: SerialBus, const N: usize>(engine: &mut TransferEngine<B, N>) {
    engine.bus_mut().set_cs(false);
}

/// Send a command frame with no response in its own transaction
pub fn command<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    frame: &CommandFrame<'_>,
) -> Result<()> {
    transaction(engine, |engine| engine.write(frame))
}

/// Send a command frame and read `response.len()` bytes in one transaction
pub fn query<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    frame: &CommandFrame<'_>,
    response: &mut [u8],
) -> Result<()> {
    transaction(engine, |engine| engine.read(frame, response))
}

/// Read the manufacturer and device ID
pub fn read_device_id<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
) -> Result<DeviceId> {
    let mut buf = [0u8; DeviceId::LEN];
    query(engine, &CommandFrame::simple(opcodes::RDDEVID), &mut buf)?;
    Ok(DeviceId::from_bytes(buf))
}

/// Read the status register
pub fn read_status<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
) -> Result<Status> {
    let mut buf = [0u8; 1];
    query(engine, &CommandFrame::simple(opcodes::RDSR), &mut buf)?;
    Ok(Status::from_bits_retain(buf[0]))
}

/// Poll the status register until the ready bit is set
///
/// Sleeps `wait.poll_interval_us` between polls and gives up with
/// [`Error::Timeout`] after `wait.max_polls()` polls. Returns the status
/// that reported ready.
pub fn wait_ready<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    wait: &WaitPolicy,
) -> Result<Status> {
    let polls = wait.max_polls();
    for poll in 1..=polls {
        let status = read_status(engine)?;
        if status.is_ready() {
            return Ok(status);
        }
        if poll < polls && wait.poll_interval_us > 0 {
            engine.bus_mut().delay_us(wait.poll_interval_us);
        }
    }

    log::warn!("device still busy after {}us", wait.timeout_us);
    Err(Error::Timeout)
}

/// Erase the page starting at `addr`
pub fn erase_page<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    addr: u32,
) -> Result<()> {
    command(engine, &CommandFrame::addressed(opcodes::PGERASE, addr))
}

/// Erase the 8-page block starting at `addr`
pub fn erase_block<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    addr: u32,
) -> Result<()> {
    command(engine, &CommandFrame::addressed(opcodes::BLKERASE, addr))
}

/// Send the four-byte chip erase sequence
pub fn erase_chip<B: SerialBus, const N: usize>(engine: &mut TransferEngine<B, N>) -> Result<()> {
    command(engine, &CommandFrame::sequence(&opcodes::CHIP_ERASE))
}

/// Program one page through buffer 1 with built-in erase
///
/// `data` is the full page contents.
pub fn program_page<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    command(engine, &CommandFrame::write_3b(opcodes::MNTHRUBF1, addr, data))
}

/// Continuous array read starting at `addr`
///
/// Reads longer than the engine's response buffer are split into several
/// transactions.
pub fn read_array<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    let max_len = engine.max_response_len();
    let mut offset = 0;

    while offset < buf.len() {
        let chunk_len = core::cmp::min(max_len, buf.len() - offset);
        let chunk = &mut buf[offset..offset + chunk_len];
        let frame = CommandFrame::read_hf(opcodes::RDARRAYHF, addr + offset as u32);
        query(engine, &frame, chunk)?;
        offset += chunk_len;
    }

    Ok(())
}

/// Write `data` into buffer 1 starting at byte `offset`
pub fn buffer_write<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    offset: u32,
    data: &[u8],
) -> Result<()> {
    let max_len = engine
        .max_frame_tail_len()
        .saturating_sub(AddressWidth::ThreeByte.bytes() as usize);
    if max_len == 0 {
        return Err(Error::FrameTooLong);
    }

    for (i, chunk) in data.chunks(max_len).enumerate() {
        let addr = offset + (i * max_len) as u32;
        command(engine, &CommandFrame::write_3b(opcodes::WRBF1, addr, chunk))?;
    }
    Ok(())
}

/// Read buffer 1 starting at byte `offset`
pub fn buffer_read<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    offset: u32,
    buf: &mut [u8],
) -> Result<()> {
    let max_len = engine.max_response_len();
    for (i, chunk) in buf.chunks_mut(max_len).enumerate() {
        let addr = offset + (i * max_len) as u32;
        query(engine, &CommandFrame::read_hf(opcodes::RDBF1, addr), chunk)?;
    }
    Ok(())
}

/// Program the page at `addr` from buffer 1, with built-in erase
pub fn buffer_to_main<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    addr: u32,
) -> Result<()> {
    command(engine, &CommandFrame::addressed(opcodes::BF1TOMNE, addr))
}

/// Copy the page at `addr` into buffer 1
pub fn main_to_buffer<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    addr: u32,
) -> Result<()> {
    command(engine, &CommandFrame::addressed(opcodes::MNTOBF1XFR, addr))
}

/// Enter deep power-down
pub fn power_down<B: SerialBus, const N: usize>(engine: &mut TransferEngine<B, N>) -> Result<()> {
    command(engine, &CommandFrame::simple(opcodes::PWRDOWN))
}

/// Leave deep power-down, then wait `settle_us` before the next command
pub fn resume<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
    settle_us: u32,
) -> Result<()> {
    command(engine, &CommandFrame::simple(opcodes::RESUME))?;
    if settle_us > 0 {
        engine.bus_mut().delay_us(settle_us);
    }
    Ok(())
}

/// Send the "configure binary page size" sequence
///
/// Takes effect after the next power cycle.
pub fn set_binary_page_size<B: SerialBus, const N: usize>(
    engine: &mut TransferEngine<B, N>,
) -> Result<()> {
    command(engine, &CommandFrame::sequence(&opcodes::BINARY_PAGE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bus that answers status and ID reads and records every byte sent
    struct ScriptBus {
        wire: heapless::Vec<u8, 128>,
        cs_edges: heapless::Vec<bool, 64>,
        selected: bool,
        session_len: usize,
        opcode: u8,
        pending: Option<u8>,
        busy_polls: u32,
        delays: u32,
    }

    impl ScriptBus {
        fn new(busy_polls: u32) -> Self {
            Self {
                wire: heapless::Vec::new(),
                cs_edges: heapless::Vec::new(),
                selected: false,
                session_len: 0,
                opcode: 0,
                pending: None,
                busy_polls,
                delays: 0,
            }
        }
    }

    impl SerialBus for ScriptBus {
        fn set_cs(&mut self, active: bool) {
            self.selected = active;
            self.session_len = 0;
            self.cs_edges.push(active).unwrap();
        }

        fn load_tx(&mut self, byte: u8) {
            assert!(self.selected, "byte 0x{:02X} sent while deselected", byte);
            self.wire.push(byte).unwrap();
            if self.session_len == 0 {
                self.opcode = byte;
            }
            let reply = match (self.opcode, self.session_len) {
                (opcodes::RDSR, 1) => {
                    if self.busy_polls > 0 {
                        self.busy_polls -= 1;
                        0x3D
                    } else {
                        0xBD
                    }
                }
                (opcodes::RDDEVID, 1) => 0x1F,
                (opcodes::RDDEVID, 2) => 0x24,
                _ => 0x00,
            };
            self.session_len += 1;
            self.pending = Some(reply);
        }

        fn wait_for_shift(&mut self) -> Result<u8> {
            self.pending.take().ok_or(Error::Timeout)
        }

        fn delay_us(&mut self, us: u32) {
            self.delays += us;
        }
    }

    fn engine(busy_polls: u32) -> TransferEngine<ScriptBus, 16> {
        TransferEngine::new(ScriptBus::new(busy_polls))
    }

    #[test]
    fn test_read_device_id() {
        let mut engine = engine(0);
        let id = read_device_id(&mut engine).unwrap();
        assert_eq!(id.manufacturer, 0x1F);
        assert_eq!(id.device_id1, 0x24);
        assert_eq!(&engine.bus().cs_edges[..], &[true, false]);
    }

    #[test]
    fn test_wait_ready_polls_until_ready() {
        let mut engine = engine(3);
        let status = wait_ready(&mut engine, &WaitPolicy::new(10, 1_000)).unwrap();
        assert!(status.is_ready());
        // Four status reads, three sleeps in between
        assert_eq!(engine.bus().wire.iter().filter(|&&b| b == opcodes::RDSR).count(), 4);
        assert_eq!(engine.bus().delays, 30);
    }

    #[test]
    fn test_wait_ready_times_out() {
        let mut engine = engine(u32::MAX);
        assert_eq!(
            wait_ready(&mut engine, &WaitPolicy::new(10, 50)),
            Err(Error::Timeout)
        );
        // Five polls, no sleep after the last one
        assert_eq!(
            engine.bus().wire.iter().filter(|&&b| b == opcodes::RDSR).count(),
            5
        );
        assert_eq!(engine.bus().delays, 40);
        assert!(!engine.bus().selected);
    }

    #[test]
    fn test_erase_commands_carry_address() {
        let mut engine = engine(0);
        erase_page(&mut engine, 0x000300).unwrap();
        erase_block(&mut engine, 0x000800).unwrap();
        erase_chip(&mut engine).unwrap();
        assert_eq!(
            &engine.bus().wire[..],
            &[0x81, 0x00, 0x03, 0x00, 0x50, 0x00, 0x08, 0x00, 0xC7, 0x94, 0x80, 0x9A]
        );
        assert_eq!(&engine.bus().cs_edges[..], &[true, false, true, false, true, false]);
    }

    #[test]
    fn test_buffer_write_splits_on_engine_capacity() {
        // 16-byte engine: 13 payload bytes fit behind a 3-byte address
        let mut engine = engine(0);
        let data = [0xAAu8; 20];
        buffer_write(&mut engine, 0x10, &data).unwrap();
        let wire = &engine.bus().wire;
        assert_eq!(wire.len(), 4 + 13 + 4 + 7);
        assert_eq!(&wire[..4], &[0x84, 0x00, 0x00, 0x10]);
        assert_eq!(&wire[17..21], &[0x84, 0x00, 0x00, 0x1D]);
    }

    #[test]
    fn test_read_array_splits_on_engine_capacity() {
        let mut engine = engine(0);
        let mut buf = [0xEEu8; 20];
        read_array(&mut engine, 0x100, &mut buf).unwrap();
        let wire = &engine.bus().wire;
        assert_eq!(&wire[..5], &[0x0B, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&wire[21..26], &[0x0B, 0x00, 0x01, 0x10, 0x00]);
        assert_eq!(buf, [0u8; 20]);
    }

    #[test]
    fn test_resume_waits_for_settle_time() {
        let mut engine = engine(0);
        resume(&mut engine, 50).unwrap();
        assert_eq!(&engine.bus().wire[..], &[0xAB]);
        assert_eq!(engine.bus().delays, 50);
    }

    #[test]
    fn test_deselect_on_failed_transfer() {
        // Engine too small for a full page program
        let mut engine = engine(0);
        let page = [0u8; 32];
        assert_eq!(
            program_page(&mut engine, 0, &page),
            Err(Error::FrameTooLong)
        );
        assert_eq!(&engine.bus().cs_edges[..], &[true, false]);
    }
}
