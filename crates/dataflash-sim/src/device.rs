//! The emulated AT45DB device

use std::fs;
use std::path::Path;

use dataflash_core::chip::{Density, DeviceId, Geometry, Status};
use dataflash_core::spi::opcodes;

use crate::error::{ImageError, Result};

/// MISO level while the device does not drive the line
const FLOATING: u8 = 0x00;

/// Configuration for the emulated device
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Emulated part
    pub density: Density,
    /// Page size already configured as a power of two
    pub binary_pages: bool,
    /// Status reads reporting busy after each erase or program
    pub busy_polls: u32,
    /// Never leave the busy state once entered
    pub stuck_busy: bool,
    /// Identification bytes to report instead of the genuine ones
    pub device_id: Option<DeviceId>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            density: Density::Mbit4,
            binary_pages: true,
            busy_polls: 3,
            stuck_busy: false,
            device_id: None,
        }
    }
}

impl SimConfig {
    /// Default configuration for the given density
    pub fn with_density(density: Density) -> Self {
        Self {
            density,
            ..Self::default()
        }
    }
}

/// One command executed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRecord {
    /// Opcode byte
    pub opcode: u8,
    /// 24-bit address, for addressed commands
    pub address: Option<u32>,
}

/// In-memory AT45DB device
///
/// Bytes arrive one at a time through [`exchange`](Self::exchange) while
/// chip select is active; read responses are produced on the fly and
/// erase/program commands execute when chip select is released, as on the
/// real part.
pub struct SimFlash {
    config: SimConfig,
    geometry: Geometry,
    data: Vec<u8>,
    buffer1: Vec<u8>,
    session: Vec<u8>,
    selected: bool,
    busy_remaining: u32,
    powered_down: bool,
    binary_pages: bool,
    binary_pending: bool,
    history: Vec<CommandRecord>,
    status_reads: u64,
    violations: usize,
}

impl SimFlash {
    /// Create an erased device
    pub fn new(config: SimConfig) -> Self {
        let geometry = config.density.geometry();
        Self {
            data: vec![0xFF; geometry.total_size() as usize],
            buffer1: vec![0xFF; geometry.page_size()],
            session: Vec::new(),
            selected: false,
            busy_remaining: 0,
            powered_down: false,
            binary_pages: config.binary_pages,
            binary_pending: false,
            history: Vec::new(),
            status_reads: 0,
            violations: 0,
            geometry,
            config,
        }
    }

    /// Create a device whose array starts with `initial_data`
    pub fn with_data(config: SimConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Create a device backed by the contents of an image file
    ///
    /// A missing file gives an erased device.
    pub fn load_image(config: SimConfig, path: &Path) -> Result<Self> {
        let mut flash = Self::new(config);
        if !path.exists() {
            log::info!("{} does not exist, starting erased", path.display());
            return Ok(flash);
        }

        let image = fs::read(path).map_err(|source| ImageError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        if image.len() != flash.data.len() {
            return Err(ImageError::SizeMismatch {
                expected: flash.data.len(),
                actual: image.len(),
            });
        }
        flash.data.copy_from_slice(&image);
        Ok(flash)
    }

    /// Write the array contents to an image file
    pub fn save_image(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.data).map_err(|source| ImageError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get a reference to the array contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the array contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Contents of SRAM buffer 1
    pub fn buffer1(&self) -> &[u8] {
        &self.buffer1
    }

    /// Commands executed so far, oldest first
    ///
    /// Status reads are only counted, see [`status_reads`](Self::status_reads).
    pub fn history(&self) -> &[CommandRecord] {
        &self.history
    }

    /// Forget the recorded command history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Number of status register reads
    pub fn status_reads(&self) -> u64 {
        self.status_reads
    }

    /// Commands received while the device was busy or asleep
    pub fn violations(&self) -> usize {
        self.violations
    }

    /// Returns true if the device is in deep power-down
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Returns true if an internal operation is running
    pub fn is_busy(&self) -> bool {
        self.busy_remaining > 0
    }

    /// Returns true if the page size is a power of two
    pub fn has_binary_pages(&self) -> bool {
        self.binary_pages
    }

    /// Remove and restore power
    ///
    /// Applies a pending page size change, wakes the device and clears the
    /// SRAM buffer; the array keeps its contents.
    pub fn power_cycle(&mut self) {
        if self.binary_pending {
            log::debug!("binary page size now in effect");
            self.binary_pages = true;
            self.binary_pending = false;
        }
        self.session.clear();
        self.selected = false;
        self.busy_remaining = 0;
        self.powered_down = false;
        self.buffer1.fill(0xFF);
    }

    /// Current status register value
    ///
    /// Reading it through [`exchange`](Self::exchange) counts as one poll.
    pub fn status(&self) -> Status {
        let mut status = Status::empty();
        if !self.is_busy() {
            status |= Status::RDY;
        }
        if self.binary_pages {
            status |= Status::PAGE_SIZE;
        }
        status
    }

    fn device_id(&self) -> DeviceId {
        self.config
            .device_id
            .unwrap_or_else(|| DeviceId::for_density(self.config.density))
    }

    /// Chip select asserted
    pub fn select(&mut self) {
        self.selected = true;
        self.session.clear();
    }

    /// Chip select released: execute the command clocked in
    pub fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        let session = std::mem::take(&mut self.session);
        if !session.is_empty() {
            self.execute(&session);
        }
    }

    /// Shift one byte: takes the MOSI byte, returns the MISO byte
    pub fn exchange(&mut self, mosi: u8) -> u8 {
        if !self.selected {
            return FLOATING;
        }

        let index = self.session.len();
        self.session.push(mosi);

        if index == 0 {
            self.check_accepts(mosi);
            return FLOATING;
        }
        if self.powered_down {
            return FLOATING;
        }

        match self.session[0] {
            opcodes::RDSR => {
                let status = self.status();
                if self.busy_remaining > 0 && !self.config.stuck_busy {
                    self.busy_remaining -= 1;
                }
                status.bits()
            }
            opcodes::RDDEVID => {
                let id = self.device_id();
                match index {
                    1 => id.manufacturer,
                    2 => id.device_id1,
                    3 => id.device_id2,
                    4 => id.extended_len,
                    _ => FLOATING,
                }
            }
            // Opcode, 3 address bytes, 1 don't-care byte, then data
            opcodes::RDARRAYHF if index >= 5 => {
                let addr = address_of(&self.session).unwrap_or(0) as usize;
                self.data[(addr + index - 5) % self.data.len()]
            }
            opcodes::RDBF1 if index >= 5 => {
                let offset = self.buffer_offset(address_of(&self.session).unwrap_or(0));
                self.buffer1[(offset + index - 5) % self.buffer1.len()]
            }
            _ => FLOATING,
        }
    }

    /// Flag opcodes the real device would ignore or mishandle right now
    fn check_accepts(&mut self, opcode: u8) {
        if self.powered_down {
            if opcode != opcodes::RESUME {
                log::warn!("opcode 0x{:02X} while in deep power-down", opcode);
                self.violations += 1;
            }
        } else if self.is_busy() && opcode != opcodes::RDSR {
            log::warn!("opcode 0x{:02X} while busy", opcode);
            self.violations += 1;
        }
    }

    fn buffer_offset(&self, addr: u32) -> usize {
        addr as usize & (self.geometry.page_size() - 1)
    }

    fn page_range(&self, addr: u32, pages: u32) -> core::ops::Range<usize> {
        let page = (addr >> self.geometry.page_shift) % self.geometry.page_count;
        let start = self.geometry.page_offset(page) as usize;
        let end = core::cmp::min(
            start + (pages as usize) * self.geometry.page_size(),
            self.data.len(),
        );
        start..end
    }

    fn start_busy(&mut self) {
        self.busy_remaining = if self.config.stuck_busy {
            u32::MAX
        } else {
            self.config.busy_polls
        };
    }

    fn execute(&mut self, session: &[u8]) {
        let opcode = session[0];
        let address = if is_addressed(opcode) {
            address_of(session)
        } else {
            None
        };

        if self.powered_down && opcode != opcodes::RESUME {
            return;
        }

        if opcode == opcodes::RDSR {
            self.status_reads += 1;
            return;
        }
        self.history.push(CommandRecord { opcode, address });

        match opcode {
            opcodes::RDDEVID | opcodes::RDARRAYHF | opcodes::RDBF1 => {}
            opcodes::PWRDOWN => self.powered_down = true,
            opcodes::RESUME => self.powered_down = false,
            opcodes::PGERASE => {
                if let Some(addr) = address {
                    let range = self.page_range(addr, 1);
                    self.data[range].fill(0xFF);
                    self.start_busy();
                }
            }
            opcodes::BLKERASE => {
                if let Some(addr) = address {
                    let block_addr = addr & !((self.geometry.page_size() as u32 * 8) - 1);
                    let range = self.page_range(block_addr, opcodes::PAGES_PER_BLOCK);
                    self.data[range].fill(0xFF);
                    self.start_busy();
                }
            }
            opcodes::WRBF1 => {
                if let Some(addr) = address {
                    self.fill_buffer(addr, &session[4..]);
                }
            }
            opcodes::MNTHRUBF1 => {
                if let Some(addr) = address {
                    self.fill_buffer(addr, &session[4..]);
                    self.buffer_to_page(addr);
                    self.start_busy();
                }
            }
            opcodes::BF1TOMNE => {
                if let Some(addr) = address {
                    self.buffer_to_page(addr);
                    self.start_busy();
                }
            }
            opcodes::MNTOBF1XFR => {
                if let Some(addr) = address {
                    let range = self.page_range(addr, 1);
                    self.buffer1.copy_from_slice(&self.data[range]);
                    self.start_busy();
                }
            }
            _ if session == &opcodes::CHIP_ERASE[..] => {
                self.data.fill(0xFF);
                self.start_busy();
            }
            _ if session == &opcodes::BINARY_PAGE_SIZE[..] => {
                log::debug!("binary page size requested, pending power cycle");
                self.binary_pending = true;
                self.start_busy();
            }
            _ => log::warn!("unsupported command: {:02X?}", session),
        }
    }

    /// Buffer writes wrap around at the end of the buffer
    fn fill_buffer(&mut self, addr: u32, data: &[u8]) {
        let start = self.buffer_offset(addr);
        let len = self.buffer1.len();
        for (i, &byte) in data.iter().enumerate() {
            self.buffer1[(start + i) % len] = byte;
        }
    }

    /// Page program with built-in erase: the page becomes the buffer
    fn buffer_to_page(&mut self, addr: u32) {
        let range = self.page_range(addr, 1);
        self.data[range].copy_from_slice(&self.buffer1);
    }
}

fn is_addressed(opcode: u8) -> bool {
    matches!(
        opcode,
        opcodes::PGERASE
            | opcodes::BLKERASE
            | opcodes::WRBF1
            | opcodes::MNTHRUBF1
            | opcodes::BF1TOMNE
            | opcodes::MNTOBF1XFR
            | opcodes::RDARRAYHF
            | opcodes::RDBF1
    )
}

/// 24-bit big-endian address following the opcode
fn address_of(session: &[u8]) -> Option<u32> {
    match session {
        [_, a2, a1, a0, ..] => Some(u32::from_be_bytes([0, *a2, *a1, *a0])),
        _ => None,
    }
}
