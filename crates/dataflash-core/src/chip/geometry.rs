//! Device geometry and the density presets of the AT45DB family

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};
use crate::spi::opcodes::PAGES_PER_BLOCK;

/// Page layout of an identified device
///
/// Set once from the identification bytes and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// log2 of the page size in bytes
    pub page_shift: u8,
    /// Number of pages in the device
    pub page_count: u32,
}

impl Geometry {
    /// Create a geometry from page shift and page count
    pub const fn new(page_shift: u8, page_count: u32) -> Self {
        Self {
            page_shift,
            page_count,
        }
    }

    /// Page size in bytes
    pub const fn page_size(&self) -> usize {
        1 << self.page_shift
    }

    /// Total device size in bytes
    pub const fn total_size(&self) -> u32 {
        self.page_count << self.page_shift
    }

    /// Number of 8-page erase blocks
    pub const fn block_count(&self) -> u32 {
        self.page_count / PAGES_PER_BLOCK
    }

    /// Byte offset of the first byte of `page`
    pub const fn page_offset(&self, page: u32) -> u32 {
        page << self.page_shift
    }

    /// Byte offset of the first byte of erase block `block`
    pub const fn block_offset(&self, block: u32) -> u32 {
        self.page_offset(block * PAGES_PER_BLOCK)
    }

    /// Check that pages `start..start + count` exist
    pub fn check_pages(&self, start: u32, count: u32) -> Result<()> {
        match start.checked_add(count) {
            Some(end) if end <= self.page_count => Ok(()),
            _ => Err(Error::AddressOutOfBounds),
        }
    }

    /// Check that the byte range `offset..offset + len` lies inside the device
    pub fn check_range(&self, offset: u32, len: usize) -> Result<()> {
        let end = offset as u64 + len as u64;
        if end <= self.total_size() as u64 {
            Ok(())
        } else {
            Err(Error::AddressOutOfBounds)
        }
    }
}

/// Density presets of the AT45DB family
///
/// Each one corresponds to a capacity code in device ID byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Density {
    /// 1 Mbit (AT45DB011)
    Mbit1,
    /// 2 Mbit (AT45DB021)
    Mbit2,
    /// 4 Mbit (AT45DB041)
    Mbit4,
    /// 8 Mbit (AT45DB081)
    Mbit8,
    /// 16 Mbit (AT45DB161)
    Mbit16,
    /// 32 Mbit (AT45DB321)
    Mbit32,
    /// 64 Mbit (AT45DB641)
    Mbit64,
}

impl Density {
    /// All supported densities, smallest first
    pub const ALL: [Density; 7] = [
        Self::Mbit1,
        Self::Mbit2,
        Self::Mbit4,
        Self::Mbit8,
        Self::Mbit16,
        Self::Mbit32,
        Self::Mbit64,
    ];

    /// Decode a capacity code (device ID byte 1, bits 4:0)
    pub const fn from_capacity_code(code: u8) -> Option<Self> {
        match code {
            0x02 => Some(Self::Mbit1),
            0x03 => Some(Self::Mbit2),
            0x04 => Some(Self::Mbit4),
            0x05 => Some(Self::Mbit8),
            0x06 => Some(Self::Mbit16),
            0x07 => Some(Self::Mbit32),
            0x08 => Some(Self::Mbit64),
            _ => None,
        }
    }

    /// Capacity code reported in device ID byte 1
    pub const fn capacity_code(self) -> u8 {
        match self {
            Self::Mbit1 => 0x02,
            Self::Mbit2 => 0x03,
            Self::Mbit4 => 0x04,
            Self::Mbit8 => 0x05,
            Self::Mbit16 => 0x06,
            Self::Mbit32 => 0x07,
            Self::Mbit64 => 0x08,
        }
    }

    /// Power-of-two page geometry for this density
    pub const fn geometry(self) -> Geometry {
        match self {
            Self::Mbit1 => Geometry::new(8, 512),
            Self::Mbit2 => Geometry::new(8, 1024),
            Self::Mbit4 => Geometry::new(8, 2048),
            Self::Mbit8 => Geometry::new(8, 4096),
            Self::Mbit16 => Geometry::new(9, 4096),
            Self::Mbit32 => Geometry::new(9, 8192),
            Self::Mbit64 => Geometry::new(10, 8192),
        }
    }

    /// Size in megabits
    pub const fn megabits(self) -> u32 {
        match self {
            Self::Mbit1 => 1,
            Self::Mbit2 => 2,
            Self::Mbit4 => 4,
            Self::Mbit8 => 8,
            Self::Mbit16 => 16,
            Self::Mbit32 => 32,
            Self::Mbit64 => 64,
        }
    }

    /// Part name of the family member with this density
    pub const fn part_name(self) -> &'static str {
        match self {
            Self::Mbit1 => "AT45DB011",
            Self::Mbit2 => "AT45DB021",
            Self::Mbit4 => "AT45DB041",
            Self::Mbit8 => "AT45DB081",
            Self::Mbit16 => "AT45DB161",
            Self::Mbit32 => "AT45DB321",
            Self::Mbit64 => "AT45DB641",
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Mbit", self.megabits())
    }
}

/// Error returned when a density string cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseDensityError;

impl fmt::Display for ParseDensityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown density (expected 1, 2, 4, 8, 16, 32 or 64 Mbit, or an AT45DB part name)"
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseDensityError {}

impl FromStr for Density {
    type Err = ParseDensityError;

    /// Accepts "4", "4mbit", "4 Mbit" or a part name such as "at45db041"
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let s = s.trim();
        for density in Self::ALL {
            if s.eq_ignore_ascii_case(density.part_name()) {
                return Ok(density);
            }
        }

        let digits = s
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .trim_end();
        let suffix = s[digits.len()..].trim_start();
        if !suffix.is_empty() && !suffix.eq_ignore_ascii_case("mbit") {
            return Err(ParseDensityError);
        }

        let megabits: u32 = digits.parse().map_err(|_| ParseDensityError)?;
        Self::ALL
            .into_iter()
            .find(|d| d.megabits() == megabits)
            .ok_or(ParseDensityError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_match_capacity_codes() {
        let expected = [
            (0x02, 8, 512),
            (0x03, 8, 1024),
            (0x04, 8, 2048),
            (0x05, 8, 4096),
            (0x06, 9, 4096),
            (0x07, 9, 8192),
            (0x08, 10, 8192),
        ];
        for (code, shift, count) in expected {
            let density = Density::from_capacity_code(code).unwrap();
            assert_eq!(density.capacity_code(), code);
            assert_eq!(density.geometry(), Geometry::new(shift, count));
        }
        assert_eq!(Density::from_capacity_code(0x01), None);
        assert_eq!(Density::from_capacity_code(0x09), None);
    }

    #[test]
    fn test_total_size_matches_density() {
        for density in Density::ALL {
            let geometry = density.geometry();
            assert_eq!(geometry.total_size(), density.megabits() * 1024 * 1024 / 8);
        }
    }

    #[test]
    fn test_offsets() {
        let geometry = Density::Mbit16.geometry();
        assert_eq!(geometry.page_size(), 512);
        assert_eq!(geometry.page_offset(3), 0x600);
        assert_eq!(geometry.block_offset(1), 8 * 512);
        assert_eq!(geometry.block_count(), 512);
    }

    #[test]
    fn test_range_checks() {
        let geometry = Density::Mbit1.geometry();
        assert!(geometry.check_pages(0, 512).is_ok());
        assert_eq!(geometry.check_pages(511, 2), Err(Error::AddressOutOfBounds));
        assert_eq!(
            geometry.check_pages(u32::MAX, 2),
            Err(Error::AddressOutOfBounds)
        );
        assert!(geometry.check_range(0x1FF00, 256).is_ok());
        assert_eq!(
            geometry.check_range(0x1FF00, 257),
            Err(Error::AddressOutOfBounds)
        );
    }

    #[test]
    fn test_parse_density() {
        assert_eq!("4".parse::<Density>(), Ok(Density::Mbit4));
        assert_eq!("16mbit".parse::<Density>(), Ok(Density::Mbit16));
        assert_eq!("64 Mbit".parse::<Density>(), Ok(Density::Mbit64));
        assert_eq!("AT45DB321".parse::<Density>(), Ok(Density::Mbit32));
        assert_eq!("at45db011".parse::<Density>(), Ok(Density::Mbit1));
        assert_eq!("3".parse::<Density>(), Err(ParseDensityError));
        assert_eq!("4 kbit".parse::<Density>(), Err(ParseDensityError));
    }
}
