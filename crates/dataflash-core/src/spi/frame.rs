//! Command frame structure

use super::{opcodes, AddressWidth};

/// Longest header: opcode + 3 address bytes + 1 don't-care byte
pub const MAX_HEADER_LEN: usize = 5;

/// One command frame as it goes on the wire
///
/// `opcode [address] [don't-care bytes] [payload]`. Designed to avoid
/// allocation: the payload is borrowed from the caller, the header is
/// encoded on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Number of don't-care bytes after the address
    pub dummy_bytes: u8,

    /// Data to write after opcode/address/don't-care bytes
    pub payload: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    /// Create a single-opcode frame (e.g. power-down, status read)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 0,
            payload: &[],
        }
    }

    /// Create a frame with a 3-byte address and nothing else (e.g. page erase)
    pub fn addressed(opcode: u8, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            dummy_bytes: 0,
            payload: &[],
        }
    }

    /// Create a high-frequency read frame: 3-byte address plus one don't-care byte
    pub fn read_hf(opcode: u8, addr: u32) -> Self {
        Self::addressed(opcode, addr).with_dummy_bytes(1)
    }

    /// Create a write frame with a 3-byte address and payload (e.g. buffer write)
    pub fn write_3b(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            dummy_bytes: 0,
            payload: data,
        }
    }

    /// Create a frame from a fixed multi-byte opcode sequence (e.g. chip erase)
    ///
    /// The first byte is the opcode; the rest goes out as payload.
    pub fn sequence(seq: &'a [u8; 4]) -> Self {
        Self {
            opcode: seq[0],
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 0,
            payload: &seq[1..],
        }
    }

    /// Set the number of don't-care bytes
    pub fn with_dummy_bytes(mut self, count: u8) -> Self {
        self.dummy_bytes = count;
        self
    }

    /// Number of command bytes: opcode, address and don't-care bytes
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + self.dummy_bytes as usize
    }

    /// Total number of bytes this frame puts on the wire
    pub fn total_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    /// Returns true if this frame has a payload phase
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// Encode opcode, address and don't-care bytes into `buf`
    ///
    /// Returns the number of bytes written. `buf` must hold at least
    /// [`header_len`](Self::header_len) bytes.
    pub fn encode_header(&self, buf: &mut [u8]) -> usize {
        buf[0] = self.opcode;
        let mut len = 1;
        if let Some(addr) = self.address {
            self.address_width.encode(addr, &mut buf[len..]);
            len += self.address_width.bytes() as usize;
        }
        for byte in &mut buf[len..len + self.dummy_bytes as usize] {
            *byte = opcodes::DONT_CARE;
        }
        len + self.dummy_bytes as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_read_header() {
        let frame = CommandFrame::read_hf(opcodes::RDARRAYHF, 0x0001_0203);
        let mut buf = [0xAAu8; MAX_HEADER_LEN];
        assert_eq!(frame.encode_header(&mut buf), 5);
        assert_eq!(buf, [0x0B, 0x01, 0x02, 0x03, 0x00]);
        assert_eq!(frame.total_len(), 5);
    }

    #[test]
    fn test_chip_erase_sequence_splits_opcode() {
        let frame = CommandFrame::sequence(&opcodes::CHIP_ERASE);
        assert_eq!(frame.opcode, 0xC7);
        assert_eq!(frame.header_len(), 1);
        assert_eq!(frame.payload, &[0x94, 0x80, 0x9A]);
        assert_eq!(frame.total_len(), 4);
    }

    #[test]
    fn test_program_frame_length() {
        let page = [0x5Au8; 256];
        let frame = CommandFrame::write_3b(opcodes::MNTHRUBF1, 0x100, &page);
        assert_eq!(frame.header_len(), 4);
        assert_eq!(frame.total_len(), 260);
        assert!(frame.has_payload());
    }
}
