//! CLI command implementations
//!
//! Every command runs the real driver stack (`DataFlash` over the Transfer
//! Engine) against the emulated part from `dataflash-sim`. A [`Session`]
//! owns the initialized driver and, when `--image` is given, persists the
//! emulated array back to disk.

mod erase;
mod probe;
mod read;
mod selftest;
mod write;

pub use erase::run_erase;
pub use probe::run_probe;
pub use read::run_read;
pub use selftest::run_selftest;
pub use write::run_write;

use crate::cli::DeviceArgs;
use dataflash_core::chip::Geometry;
use dataflash_core::config::DriverConfig;
use dataflash_core::flash::{DataFlash, PageProgress};
use dataflash_core::Error;
use dataflash_sim::{SimBus, SimConfig, SimFlash};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// An initialized driver plus the image it is backed by
pub struct Session {
    pub flash: DataFlash<SimBus>,
    pub geometry: Geometry,
    image: Option<PathBuf>,
}

impl Session {
    /// Build the emulated part, wrap it in the driver and initialize it
    ///
    /// A part reporting legacy page sizes is reprogrammed, power cycled and
    /// initialized a second time, as an operator would do on hardware.
    pub fn open(args: &DeviceArgs, config: DriverConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let sim = SimConfig {
            density: args.density,
            binary_pages: !args.legacy_pages,
            ..SimConfig::default()
        };
        let device = match &args.image {
            Some(path) => SimFlash::load_image(sim, path)?,
            None => SimFlash::new(sim),
        };

        let mut flash = DataFlash::new(SimBus::new(device), config);
        let geometry = match flash.initialize() {
            Ok(geometry) => geometry,
            Err(Error::LegacyPageFormat) => {
                log::warn!("Power cycling the emulated part");
                flash.bus_mut().power_cycle();
                flash.initialize()?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            flash,
            geometry,
            image: args.image.clone(),
        })
    }

    /// Write the emulated array back to the image file, if there is one
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = &self.image {
            self.flash.bus().flash().save_image(path)?;
            log::info!("Saved image to {:?}", path);
        }
        Ok(())
    }
}

/// Page progress shown as an indicatif bar
pub struct BarProgress {
    pb: ProgressBar,
    phase: &'static str,
}

impl BarProgress {
    pub fn new(phase: &'static str) -> Self {
        Self {
            pb: ProgressBar::hidden(),
            phase,
        }
    }
}

impl PageProgress for BarProgress {
    fn begin(&mut self, total_pages: u32) {
        self.pb = ProgressBar::new(total_pages as u64);
        self.pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} pages ({{eta}}) {}",
                    self.phase
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
    }

    fn page_done(&mut self, pages_done: u32) {
        self.pb.set_position(pages_done as u64);
    }

    fn finish(&mut self) {
        self.pb.finish_with_message(format!("{} complete", self.phase));
    }
}
