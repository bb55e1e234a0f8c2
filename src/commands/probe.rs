//! Probe command implementation

use super::Session;
use dataflash_core::chip::Density;
use dataflash_core::config::PowerPolicy;

/// Show what `initialize` found
pub fn run_probe(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = session.geometry;
    let density = Density::ALL
        .into_iter()
        .find(|d| d.geometry() == geometry);

    // The status register reads as floating lines in deep power-down
    let sleeping = session.flash.config().power_policy == PowerPolicy::SleepBetweenOperations;
    if sleeping {
        session.flash.resume()?;
    }
    let status = session.flash.read_status()?;
    if sleeping {
        session.flash.power_down()?;
    }

    println!("Found DataFlash:");
    if let Some(density) = density {
        println!("  Part:   {} ({})", density.part_name(), density);
    }
    println!(
        "  Size:   {} bytes ({} KiB)",
        geometry.total_size(),
        geometry.total_size() / 1024
    );
    println!(
        "  Pages:  {} x {} bytes, {} erase blocks",
        geometry.page_count,
        geometry.page_size(),
        geometry.block_count()
    );
    println!("  Status: {:02X} ({:?})", status.bits(), status);
    Ok(())
}
