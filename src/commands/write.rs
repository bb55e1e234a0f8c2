//! Write command implementation

use super::read::read_with_progress;
use super::{BarProgress, Session};
use std::fs;
use std::path::Path;

/// Run the write command
///
/// The file is padded with 0xFF to a whole number of pages and programmed
/// page by page starting at `start_page`.
pub fn run_write(
    session: &mut Session,
    input: &Path,
    start_page: u32,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut data = fs::read(input)?;
    if data.is_empty() {
        return Err(format!("{:?} is empty", input).into());
    }

    let geometry = session.geometry;
    let page_size = geometry.page_size();
    let pages = data.len().div_ceil(page_size);
    data.resize(pages * page_size, 0xFF);
    let pages = u32::try_from(pages).map_err(|_| "input file too large")?;

    if geometry.check_pages(start_page, pages).is_err() {
        return Err(format!(
            "{} pages starting at page {} do not fit in {} pages",
            pages, start_page, geometry.page_count
        )
        .into());
    }

    session
        .flash
        .program_blocks_with_progress(start_page, pages, &data, BarProgress::new("Writing"))?;
    println!("Programmed {} pages starting at page {}", pages, start_page);

    if verify {
        let readback = read_with_progress(session, geometry.page_offset(start_page), data.len())?;
        if let Some(pos) = readback.iter().zip(&data).position(|(a, b)| a != b) {
            return Err(format!(
                "Verification failed at offset 0x{:08X}",
                geometry.page_offset(start_page) as usize + pos
            )
            .into());
        }
        println!("Verified {} bytes", data.len());
    }

    Ok(())
}
