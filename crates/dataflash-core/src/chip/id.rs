//! Manufacturer and device ID decoding

use core::fmt;

use super::Density;
use crate::error::{Error, Result};
use crate::spi::opcodes::{
    DEVID1_CAPACITY_MASK, DEVID1_DATAFLASH, DEVID1_FAMILY_MASK, MANUFACTURER,
};

/// Identification bytes returned by opcode 0x9F
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    /// JEDEC manufacturer code
    pub manufacturer: u8,
    /// Device ID byte 1: family code (bits 7:5) and capacity code (bits 4:0)
    pub device_id1: u8,
    /// Device ID byte 2: MLC code and product version
    pub device_id2: u8,
    /// Extended device information length
    pub extended_len: u8,
}

impl DeviceId {
    /// Number of bytes read back for identification
    pub const LEN: usize = 4;

    /// Build from the raw response bytes
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self {
            manufacturer: bytes[0],
            device_id1: bytes[1],
            device_id2: bytes[2],
            extended_len: bytes[3],
        }
    }

    /// The ID a genuine part of the given density reports
    pub const fn for_density(density: Density) -> Self {
        Self {
            manufacturer: MANUFACTURER,
            device_id1: DEVID1_DATAFLASH | density.capacity_code(),
            device_id2: 0x00,
            extended_len: 0x00,
        }
    }

    /// Family code bits of device ID byte 1
    pub const fn family(&self) -> u8 {
        self.device_id1 & DEVID1_FAMILY_MASK
    }

    /// Capacity code bits of device ID byte 1
    pub const fn capacity_code(&self) -> u8 {
        self.device_id1 & DEVID1_CAPACITY_MASK
    }

    /// Validate manufacturer and family, then decode the density
    pub fn density(&self) -> Result<Density> {
        if self.manufacturer != MANUFACTURER || self.family() != DEVID1_DATAFLASH {
            return Err(Error::UnrecognizedDevice);
        }
        Density::from_capacity_code(self.capacity_code()).ok_or(Error::UnrecognizedDevice)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "manufacturer: {:02x} devid1: {:02x} devid2: {:02x}",
            self.manufacturer, self.device_id1, self.device_id2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at45db041_id() {
        let id = DeviceId::from_bytes([0x1F, 0x24, 0x00, 0x00]);
        assert_eq!(id.density(), Ok(Density::Mbit4));
        assert_eq!(id.density().unwrap().geometry().page_shift, 8);
        assert_eq!(id.density().unwrap().geometry().page_count, 2048);
    }

    #[test]
    fn test_for_density_round_trips() {
        for density in Density::ALL {
            assert_eq!(DeviceId::for_density(density).density(), Ok(density));
        }
    }

    #[test]
    fn test_rejects_wrong_manufacturer_family_or_capacity() {
        // Winbond W25Q
        let id = DeviceId::from_bytes([0xEF, 0x40, 0x18, 0x00]);
        assert_eq!(id.density(), Err(Error::UnrecognizedDevice));
        // Atmel, but not the DataFlash family
        let id = DeviceId::from_bytes([0x1F, 0x44, 0x01, 0x00]);
        assert_eq!(id.density(), Err(Error::UnrecognizedDevice));
        // DataFlash family, unknown capacity
        let id = DeviceId::from_bytes([0x1F, 0x29, 0x00, 0x00]);
        assert_eq!(id.density(), Err(Error::UnrecognizedDevice));
        // No device on the bus: MISO floats high
        let id = DeviceId::from_bytes([0xFF; 4]);
        assert_eq!(id.density(), Err(Error::UnrecognizedDevice));
    }
}
