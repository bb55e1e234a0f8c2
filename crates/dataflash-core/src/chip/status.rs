//! Status register flags

use bitflags::bitflags;

bitflags! {
    /// AT45DB status register (opcode 0xD7)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Device ready (not busy with an internal operation)
        const RDY       = 1 << 7;
        /// Last compare: main memory page differs from buffer
        const COMP      = 1 << 6;
        /// Sector protection enabled
        const PROTECT   = 1 << 1;
        /// Page size configured as a power of two
        const PAGE_SIZE = 1 << 0;
    }
}

impl Status {
    /// Returns true if the device has finished its last internal operation
    pub fn is_ready(&self) -> bool {
        self.contains(Self::RDY)
    }

    /// Returns true if the device still uses the legacy 264/528/1056-byte pages
    pub fn is_legacy_page_size(&self) -> bool {
        !self.contains(Self::PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_and_page_size_bits() {
        let sr = Status::from_bits_retain(0xBD);
        assert!(sr.is_ready());
        assert!(!sr.is_legacy_page_size());
        assert_eq!(sr.bits(), 0xBD);

        let sr = Status::from_bits_retain(0x1C);
        assert!(!sr.is_ready());
        assert!(sr.is_legacy_page_size());
    }
}
