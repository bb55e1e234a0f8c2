//! DataFlash device driver

use crate::bus::{SerialBus, TransferEngine, MAX_TRANSFER_LEN};
use crate::chip::{Geometry, Status};
use crate::config::{BusyWaitPolicy, DriverConfig, PowerPolicy, WaitPolicy};
use crate::error::{Error, Result};
use crate::flash::{NoProgress, PageProgress};
use crate::protocol;
use crate::spi::opcodes::PAGES_PER_BLOCK;

/// AT45DB DataFlash driver
///
/// Wraps a [`TransferEngine`] together with the device geometry learned at
/// identification and the [`DriverConfig`] policies.
///
/// With [`BusyWaitPolicy::PreOperation`] every erase or program returns as
/// soon as the command is on the wire and leaves the device busy; the next
/// operation waits for ready first. With [`BusyWaitPolicy::PostOperation`]
/// each such command waits before returning.
///
/// # Example
///
/// ```ignore
/// use dataflash_core::{config::DriverConfig, flash::DataFlash};
///
/// let mut flash = DataFlash::new(bus, DriverConfig::default());
/// let geometry = flash.initialize()?;
///
/// let page = [0x5A; 256];
/// flash.program_page(3, &page)?;
/// let mut buf = [0u8; 256];
/// flash.read_bytes(geometry.page_offset(3), &mut buf)?;
/// ```
pub struct DataFlash<B, const N: usize = MAX_TRANSFER_LEN> {
    engine: TransferEngine<B, N>,
    config: DriverConfig,
    geometry: Option<Geometry>,
    /// Wait policy for the operation the device may still be busy with
    outstanding: WaitPolicy,
    /// Inside a resume/power-down bracket
    awake: bool,
    /// Last power command sent was PWRDOWN
    powered_down: bool,
}

impl<B: SerialBus, const N: usize> DataFlash<B, N> {
    /// Create a driver around a bus peripheral
    ///
    /// Nothing is sent until [`initialize`](Self::initialize) or
    /// [`identify`](Self::identify) is called.
    pub fn new(bus: B, config: DriverConfig) -> Self {
        Self {
            engine: TransferEngine::new(bus),
            outstanding: config.wait,
            config,
            geometry: None,
            awake: false,
            powered_down: false,
        }
    }

    /// Get the driver configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Geometry of the identified device, if identification succeeded
    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    /// Get a reference to the bus peripheral
    pub fn bus(&self) -> &B {
        self.engine.bus()
    }

    /// Get a mutable reference to the bus peripheral
    pub fn bus_mut(&mut self) -> &mut B {
        self.engine.bus_mut()
    }

    /// Get a reference to the Transfer Engine
    pub fn engine(&self) -> &TransferEngine<B, N> {
        &self.engine
    }

    /// Consume the driver and return the bus peripheral
    pub fn release(self) -> B {
        self.engine.into_bus()
    }

    fn require_geometry(&self) -> Result<Geometry> {
        self.geometry.ok_or(Error::NotInitialized)
    }

    // ------------------------------------------------------------------
    // Bring-up
    // ------------------------------------------------------------------

    /// Bring the device up and learn its geometry
    ///
    /// Deselects, resumes from deep power-down, identifies the part and
    /// waits for ready. A part still configured for legacy page sizes is
    /// sent the binary page size sequence and the call fails with
    /// [`Error::LegacyPageFormat`]; the geometry stays unset until a later
    /// `initialize` after a power cycle succeeds.
    pub fn initialize(&mut self) -> Result<Geometry> {
        protocol::deselect(&mut self.engine);
        self.resume()?;

        let geometry = match self.read_geometry() {
            Ok(geometry) => geometry,
            Err(e) => {
                log::error!("DataFlash not recognized");
                return Err(e);
            }
        };

        let status = self.wait_ready()?;
        log::debug!("status register: {:02x}", status.bits());

        if status.is_legacy_page_size() {
            log::warn!("Reprogramming page size; power cycle the device and initialize again");
            self.reprogram_page_size()?;
            return Err(Error::LegacyPageFormat);
        }

        let geometry = *self.geometry.get_or_insert(geometry);
        self.sleep()?;
        Ok(geometry)
    }

    /// Read the identification bytes and store the geometry they describe
    ///
    /// Unlike [`initialize`](Self::initialize) this never reprograms the
    /// part: a device still on legacy page sizes fails with
    /// [`Error::LegacyPageFormat`]. On any error the stored geometry is left
    /// as it was.
    pub fn identify(&mut self) -> Result<Geometry> {
        let geometry = self.read_geometry()?;
        if self.read_status()?.is_legacy_page_size() {
            return Err(Error::LegacyPageFormat);
        }
        Ok(*self.geometry.get_or_insert(geometry))
    }

    fn read_geometry(&mut self) -> Result<Geometry> {
        let id = protocol::read_device_id(&mut self.engine)?;
        log::info!("{}", id);

        let density = id.density()?;
        let geometry = density.geometry();
        log::info!(
            "capacity: {:02x} ({} {}, {} pages of {} bytes)",
            id.capacity_code(),
            density.part_name(),
            density,
            geometry.page_count,
            geometry.page_size()
        );
        Ok(geometry)
    }

    // ------------------------------------------------------------------
    // Status and power
    // ------------------------------------------------------------------

    /// Read the status register
    pub fn read_status(&mut self) -> Result<Status> {
        protocol::read_status(&mut self.engine)
    }

    /// Wait until the device reports ready
    ///
    /// Bounded by the wait policy of the last operation left running (the
    /// chip-erase policy after [`erase_chip`](Self::erase_chip)).
    pub fn wait_ready(&mut self) -> Result<Status> {
        let wait = self.outstanding;
        let status = protocol::wait_ready(&mut self.engine, &wait)?;
        self.outstanding = self.config.wait;
        Ok(status)
    }

    /// Enter deep power-down
    ///
    /// Under [`BusyWaitPolicy::PreOperation`] the operation left running is
    /// waited for first; the part ignores PWRDOWN while busy. Does nothing
    /// if the device is already powered down.
    pub fn power_down(&mut self) -> Result<()> {
        if self.powered_down {
            return Ok(());
        }
        self.before_command()?;
        log::trace!("power down");
        protocol::power_down(&mut self.engine)?;
        self.powered_down = true;
        Ok(())
    }

    /// Leave deep power-down and wait the configured settle time
    pub fn resume(&mut self) -> Result<()> {
        log::trace!("resume");
        protocol::resume(&mut self.engine, self.config.resume_settle_us)?;
        self.powered_down = false;
        Ok(())
    }

    /// Switch the device to power-of-two page sizes
    ///
    /// Takes effect after the next power cycle.
    pub fn reprogram_page_size(&mut self) -> Result<()> {
        self.before_command()?;
        protocol::set_binary_page_size(&mut self.engine)?;
        self.after_command(self.config.wait)
    }

    fn before_command(&mut self) -> Result<()> {
        if self.config.busy_wait_policy == BusyWaitPolicy::PreOperation {
            self.wait_ready()?;
        }
        Ok(())
    }

    fn after_command(&mut self, wait: WaitPolicy) -> Result<()> {
        match self.config.busy_wait_policy {
            BusyWaitPolicy::PreOperation => {
                self.outstanding = wait;
                Ok(())
            }
            BusyWaitPolicy::PostOperation => {
                protocol::wait_ready(&mut self.engine, &wait)?;
                Ok(())
            }
        }
    }

    fn wake(&mut self) -> Result<()> {
        match self.config.power_policy {
            PowerPolicy::SleepBetweenOperations if self.powered_down => self.resume(),
            _ => Ok(()),
        }
    }

    fn sleep(&mut self) -> Result<()> {
        match self.config.power_policy {
            PowerPolicy::AlwaysOn => Ok(()),
            PowerPolicy::SleepBetweenOperations => self.power_down(),
        }
    }

    /// Run `f` between a resume and a power-down, as the power policy asks
    ///
    /// Nested calls share the outermost bracket. A failed `f` skips the
    /// power-down and leaves the device awake.
    fn powered<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.awake || self.config.power_policy == PowerPolicy::AlwaysOn {
            return f(self);
        }

        self.wake()?;
        self.awake = true;
        let result = f(self);
        self.awake = false;
        let value = result?;
        self.sleep()?;
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Single page operations
    // ------------------------------------------------------------------

    /// Erase one page
    pub fn erase_page(&mut self, page: u32) -> Result<()> {
        let geometry = self.require_geometry()?;
        geometry.check_pages(page, 1)?;

        let offset = geometry.page_offset(page);
        log::debug!("erase page: {:08x} offset: {:06x}", page, offset);

        self.powered(|flash| {
            flash.before_command()?;
            protocol::erase_page(&mut flash.engine, offset)?;
            flash.after_command(flash.config.wait)
        })
    }

    /// Erase one 8-page block
    pub fn erase_block(&mut self, block: u32) -> Result<()> {
        let geometry = self.require_geometry()?;
        let first = block
            .checked_mul(PAGES_PER_BLOCK)
            .ok_or(Error::AddressOutOfBounds)?;
        geometry.check_pages(first, PAGES_PER_BLOCK)?;

        let offset = geometry.block_offset(block);
        log::debug!("erase block: {:08x} offset: {:06x}", block, offset);

        self.powered(|flash| {
            flash.before_command()?;
            protocol::erase_block(&mut flash.engine, offset)?;
            flash.after_command(flash.config.wait)
        })
    }

    /// Erase the whole device
    pub fn erase_chip(&mut self) -> Result<()> {
        log::debug!("chip erase");
        self.powered(|flash| {
            flash.before_command()?;
            protocol::erase_chip(&mut flash.engine)?;
            flash.after_command(flash.config.chip_erase_wait)
        })
    }

    /// Program one page through buffer 1 with built-in erase
    ///
    /// Only the first page-size bytes of `data` are used.
    pub fn program_page(&mut self, page: u32, data: &[u8]) -> Result<()> {
        let geometry = self.require_geometry()?;
        geometry.check_pages(page, 1)?;
        let page_size = geometry.page_size();
        if data.len() < page_size {
            return Err(Error::BufferTooSmall);
        }

        let offset = geometry.page_offset(page);
        log::debug!("page: {:08x} offset: {:08x}", page, offset);

        self.powered(|flash| {
            flash.before_command()?;
            protocol::program_page(&mut flash.engine, offset, &data[..page_size])?;
            flash.after_command(flash.config.wait)
        })
    }

    // ------------------------------------------------------------------
    // Multi-page operations
    // ------------------------------------------------------------------

    /// Erase `count` pages starting at `start`, one page-erase each
    ///
    /// Returns the number of pages erased.
    pub fn erase_blocks(&mut self, start: u32, count: u32) -> Result<usize> {
        self.erase_blocks_with_progress(start, count, NoProgress)
    }

    /// Like [`erase_blocks`](Self::erase_blocks), reporting each page
    pub fn erase_blocks_with_progress<P: PageProgress>(
        &mut self,
        start: u32,
        count: u32,
        mut progress: P,
    ) -> Result<usize> {
        let geometry = self.require_geometry()?;
        geometry.check_pages(start, count)?;
        log::debug!("startblock: {:08x} nblocks: {}", start, count);

        self.powered(|flash| {
            progress.begin(count);
            for i in 0..count {
                flash.erase_page(start + i)?;
                progress.page_done(i + 1);
            }
            progress.finish();
            Ok(count as usize)
        })
    }

    /// Program `count` pages starting at `start` from consecutive slices of `data`
    ///
    /// Returns the number of pages programmed.
    pub fn program_blocks(&mut self, start: u32, count: u32, data: &[u8]) -> Result<usize> {
        self.program_blocks_with_progress(start, count, data, NoProgress)
    }

    /// Like [`program_blocks`](Self::program_blocks), reporting each page
    pub fn program_blocks_with_progress<P: PageProgress>(
        &mut self,
        start: u32,
        count: u32,
        data: &[u8],
        mut progress: P,
    ) -> Result<usize> {
        let geometry = self.require_geometry()?;
        geometry.check_pages(start, count)?;
        let page_size = geometry.page_size();
        if data.len() < count as usize * page_size {
            return Err(Error::BufferTooSmall);
        }
        log::debug!("startblock: {:08x} nblocks: {}", start, count);

        self.powered(|flash| {
            progress.begin(count);
            for (i, page) in data.chunks_exact(page_size).take(count as usize).enumerate() {
                flash.program_page(start + i as u32, page)?;
                progress.page_done(i as u32 + 1);
            }
            progress.finish();
            Ok(count as usize)
        })
    }

    /// Read `count` whole pages starting at `start`
    ///
    /// Returns the number of pages read.
    pub fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> Result<usize> {
        let geometry = self.require_geometry()?;
        geometry.check_pages(start, count)?;
        let len = count as usize * geometry.page_size();
        if buf.len() < len {
            return Err(Error::BufferTooSmall);
        }

        let nbytes = self.read_bytes(geometry.page_offset(start), &mut buf[..len])?;
        Ok(nbytes >> geometry.page_shift)
    }

    /// Read `buf.len()` bytes starting at byte `offset`
    ///
    /// Returns the number of bytes read.
    pub fn read_bytes(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let geometry = self.require_geometry()?;
        geometry.check_range(offset, buf.len())?;
        log::debug!("offset: {:08x} nbytes: {}", offset, buf.len());

        self.powered(|flash| {
            flash.before_command()?;
            protocol::read_array(&mut flash.engine, offset, buf)?;
            Ok(buf.len())
        })
    }

    // ------------------------------------------------------------------
    // SRAM buffer 1
    // ------------------------------------------------------------------

    fn check_buffer_range(&self, offset: u32, len: usize) -> Result<()> {
        let geometry = self.require_geometry()?;
        if offset as u64 + len as u64 > geometry.page_size() as u64 {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }

    /// Write `data` into buffer 1 at byte `offset`
    pub fn buffer_write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.check_buffer_range(offset, data.len())?;
        log::debug!("buffer 1 write: offset {:04x}, {} bytes", offset, data.len());
        self.powered(|flash| {
            flash.before_command()?;
            protocol::buffer_write(&mut flash.engine, offset, data)
        })
    }

    /// Read buffer 1 from byte `offset` into `buf`
    pub fn buffer_read(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.check_buffer_range(offset, buf.len())?;
        log::debug!("buffer 1 read: offset {:04x}, {} bytes", offset, buf.len());
        self.powered(|flash| {
            flash.before_command()?;
            protocol::buffer_read(&mut flash.engine, offset, buf)
        })
    }

    /// Program `page` from buffer 1, with built-in erase
    pub fn buffer_to_main(&mut self, page: u32) -> Result<()> {
        let geometry = self.require_geometry()?;
        geometry.check_pages(page, 1)?;
        log::debug!("buffer 1 to page {}", page);

        self.powered(|flash| {
            flash.before_command()?;
            protocol::buffer_to_main(&mut flash.engine, geometry.page_offset(page))?;
            flash.after_command(flash.config.wait)
        })
    }

    /// Load `page` into buffer 1
    pub fn main_to_buffer(&mut self, page: u32) -> Result<()> {
        let geometry = self.require_geometry()?;
        geometry.check_pages(page, 1)?;
        log::debug!("page {} to buffer 1", page);

        self.powered(|flash| {
            flash.before_command()?;
            protocol::main_to_buffer(&mut flash.engine, geometry.page_offset(page))?;
            flash.after_command(flash.config.wait)
        })
    }
}
