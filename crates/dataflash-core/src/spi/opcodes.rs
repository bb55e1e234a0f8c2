//! AT45DB DataFlash opcodes and identification constants
//!
//! Values follow the Adesto/Atmel AT45DB datasheets. Only the subset used
//! by the driver (and understood by the emulator) is listed.

// ============================================================================
// Identification and status
// ============================================================================

/// Manufacturer and Device ID Read
pub const RDDEVID: u8 = 0x9F;
/// Status Register Read
pub const RDSR: u8 = 0xD7;

// ============================================================================
// Read commands
// ============================================================================

/// Continuous Array Read, high frequency (one don't-care byte after the address)
pub const RDARRAYHF: u8 = 0x0B;
/// Buffer 1 Read, high frequency (one don't-care byte after the address)
pub const RDBF1: u8 = 0xD4;

// ============================================================================
// Program and erase commands
// ============================================================================

/// Buffer 1 Write
pub const WRBF1: u8 = 0x84;
/// Buffer 1 to Main Memory Page Program with Built-in Erase
pub const BF1TOMNE: u8 = 0x83;
/// Main Memory Page Program through Buffer 1 (with built-in erase)
pub const MNTHRUBF1: u8 = 0x82;
/// Main Memory Page to Buffer 1 Transfer
pub const MNTOBF1XFR: u8 = 0x53;
/// Page Erase
pub const PGERASE: u8 = 0x81;
/// Block Erase (8 pages)
pub const BLKERASE: u8 = 0x50;

/// Chip Erase sequence
pub const CHIP_ERASE: [u8; 4] = [0xC7, 0x94, 0x80, 0x9A];

/// Configure power-of-two ("binary") page size sequence
///
/// One-time programmable on older parts; takes effect after a power cycle.
pub const BINARY_PAGE_SIZE: [u8; 4] = [0x3D, 0x2A, 0x80, 0xA6];

// ============================================================================
// Power management
// ============================================================================

/// Deep Power-down
pub const PWRDOWN: u8 = 0xB9;
/// Resume from Deep Power-down
pub const RESUME: u8 = 0xAB;

// ============================================================================
// Bus constants
// ============================================================================

/// Byte shifted out to clock a response in
pub const FILLER: u8 = 0xFF;
/// Value sent for the "don't care" byte of the high-frequency reads
pub const DONT_CARE: u8 = 0x00;

// ============================================================================
// Identification
// ============================================================================

/// JEDEC manufacturer code (Atmel/Adesto)
pub const MANUFACTURER: u8 = 0x1F;
/// Device ID byte 1: family code mask
pub const DEVID1_FAMILY_MASK: u8 = 0xE0;
/// Device ID byte 1: DataFlash family code
pub const DEVID1_DATAFLASH: u8 = 0x20;
/// Device ID byte 1: density (capacity) code mask
pub const DEVID1_CAPACITY_MASK: u8 = 0x1F;

/// Number of pages covered by one block erase
pub const PAGES_PER_BLOCK: u32 = 8;
