//! Simulated shift-register peripheral

use dataflash_core::bus::SerialBus;
use dataflash_core::error::{Error, Result};

use crate::device::SimFlash;

/// Serial bus wired to a [`SimFlash`]
///
/// Loading a byte shifts it into the device immediately; the "byte shifted"
/// interrupt is then pending until [`wait_for_shift`](SerialBus::wait_for_shift)
/// collects it. Delays are not slept, only accumulated.
pub struct SimBus {
    flash: SimFlash,
    selected: bool,
    pending: Option<u8>,
    interrupts_enabled: bool,
    bytes_shifted: u64,
    elapsed_us: u64,
}

impl SimBus {
    /// Connect a bus to an emulated device
    pub fn new(flash: SimFlash) -> Self {
        Self {
            flash,
            selected: false,
            pending: None,
            interrupts_enabled: true,
            bytes_shifted: 0,
            elapsed_us: 0,
        }
    }

    /// Get a reference to the emulated device
    pub fn flash(&self) -> &SimFlash {
        &self.flash
    }

    /// Get a mutable reference to the emulated device
    pub fn flash_mut(&mut self) -> &mut SimFlash {
        &mut self.flash
    }

    /// Disconnect the bus and return the emulated device
    pub fn into_flash(self) -> SimFlash {
        self.flash
    }

    /// Remove and restore power to the device
    pub fn power_cycle(&mut self) {
        self.selected = false;
        self.pending = None;
        self.flash.power_cycle();
    }

    /// Stop delivering byte-shifted interrupts
    ///
    /// Every later wait times out, as with a dead peripheral clock.
    pub fn set_interrupts_enabled(&mut self, enabled: bool) {
        self.interrupts_enabled = enabled;
    }

    /// Total bytes shifted over the bus
    pub fn bytes_shifted(&self) -> u64 {
        self.bytes_shifted
    }

    /// Sum of all requested delays, in microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }
}

impl SerialBus for SimBus {
    fn set_cs(&mut self, active: bool) {
        if active == self.selected {
            return;
        }
        self.selected = active;
        if active {
            self.flash.select();
        } else {
            self.flash.deselect();
        }
    }

    fn load_tx(&mut self, byte: u8) {
        self.bytes_shifted += 1;
        self.pending = Some(self.flash.exchange(byte));
    }

    fn wait_for_shift(&mut self) -> Result<u8> {
        if !self.interrupts_enabled {
            self.pending = None;
            return Err(Error::Timeout);
        }
        self.pending.take().ok_or(Error::Timeout)
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
    }
}
