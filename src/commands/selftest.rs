//! Selftest command implementation
//!
//! Exercises the SRAM buffer and the buffer/main-memory transfers on page 0:
//! a pattern is written to the buffer and committed to page 0, the buffer is
//! overwritten, then page 0 is loaded back into the buffer.

use super::Session;
use thiserror::Error;

const PATTERN: &[u8; 14] = b"1234567890UUAA";
const SCRATCH: &[u8; 14] = b"              ";

/// A stage of the selftest read back something unexpected
#[derive(Debug, Error)]
#[error("{stage} readback mismatch: expected {expected:?}, found {found:?}")]
pub struct SelftestError {
    stage: &'static str,
    expected: String,
    found: String,
}

fn check(stage: &'static str, expected: &[u8], found: &[u8]) -> Result<(), SelftestError> {
    if expected == found {
        return Ok(());
    }
    Err(SelftestError {
        stage,
        expected: String::from_utf8_lossy(expected).into_owned(),
        found: String::from_utf8_lossy(found).into_owned(),
    })
}

/// Run the selftest command
///
/// Destroys the contents of the first erase block.
pub fn run_selftest(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let flash = &mut session.flash;
    let mut buf = [0u8; PATTERN.len()];

    println!("Erasing block 0...");
    flash.erase_block(0)?;

    flash.buffer_write(0, PATTERN)?;
    flash.buffer_read(0, &mut buf)?;
    println!("First: {}", String::from_utf8_lossy(&buf));
    check("buffer", PATTERN, &buf)?;

    flash.buffer_to_main(0)?;
    flash.buffer_write(0, SCRATCH)?;
    flash.main_to_buffer(0)?;

    flash.buffer_read(0, &mut buf)?;
    println!("Second: {}", String::from_utf8_lossy(&buf));
    check("page 0", PATTERN, &buf)?;

    println!("Selftest passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_stage() {
        assert!(check("buffer", PATTERN, PATTERN).is_ok());

        let err = check("page 0", PATTERN, SCRATCH).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("page 0 readback mismatch"));
        assert!(msg.contains("1234567890UUAA"));
    }
}
