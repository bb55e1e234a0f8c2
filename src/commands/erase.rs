//! Erase command implementation

use super::{BarProgress, Session};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Run the erase command
pub fn run_erase(
    session: &mut Session,
    start_page: Option<u32>,
    pages: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    match (start_page, pages) {
        (Some(start), Some(count)) => {
            session
                .flash
                .erase_blocks_with_progress(start, count, BarProgress::new("Erasing"))?;
            println!("Erased {} pages starting at page {}", count, start);
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err("Both --start-page and --pages must be specified for partial erase".into());
        }
        (None, None) => chip_erase_with_progress(session)?,
    }

    Ok(())
}

/// Erase the whole chip with a progress spinner
fn chip_erase_with_progress(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let total_size = session.geometry.total_size();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "Erasing {} bytes (this may take a while)...",
        total_size
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    session.flash.erase_chip()?;

    pb.finish_with_message(format!("Erased {} bytes", total_size));
    Ok(())
}
