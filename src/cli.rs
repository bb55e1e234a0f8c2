//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use dataflash_core::chip::Density;
use dataflash_core::config::{BusyWaitPolicy, PowerPolicy};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "dataflash")]
#[command(author, version, about = "AT45DB DataFlash driver running against an emulated part", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Driver configuration file (TOML format)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub device: DeviceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Emulated device and driver policy options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Flash image backing the emulated part (created if missing, saved after
    /// modifying commands)
    #[arg(long, global = true)]
    pub image: Option<PathBuf>,

    /// Emulated density: 1, 2, 4, 8, 16, 32 or 64 (Mbit), or a part name
    #[arg(long, global = true, default_value = "4")]
    pub density: Density,

    /// Emulate a part still configured for legacy page sizes
    #[arg(long, global = true)]
    pub legacy_pages: bool,

    /// Override when to wait for the ready bit
    #[arg(long, global = true, value_enum)]
    pub busy_wait: Option<BusyWaitArg>,

    /// Put the device into deep power-down between operations
    #[arg(long, global = true)]
    pub power_save: bool,
}

/// Ready-wait placement
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyWaitArg {
    /// Wait before the next command, leave the device busy
    Pre,
    /// Wait right after each command
    Post,
}

impl From<BusyWaitArg> for BusyWaitPolicy {
    fn from(arg: BusyWaitArg) -> Self {
        match arg {
            BusyWaitArg::Pre => BusyWaitPolicy::PreOperation,
            BusyWaitArg::Post => BusyWaitPolicy::PostOperation,
        }
    }
}

impl DeviceArgs {
    /// Power policy selected on the command line, if any
    pub fn power_policy(&self) -> Option<PowerPolicy> {
        self.power_save
            .then_some(PowerPolicy::SleepBetweenOperations)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the part and show its geometry
    Probe,

    /// Read flash contents to file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start offset in bytes (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (default: up to the end of the device)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Program a file into consecutive pages
    Write {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// First page to program
        #[arg(long, default_value = "0")]
        start_page: u32,

        /// Verify after writing
        #[arg(long, default_value = "true")]
        verify: bool,
    },

    /// Erase pages, or the whole chip
    Erase {
        /// First page to erase (requires --pages)
        #[arg(long)]
        start_page: Option<u32>,

        /// Number of pages to erase (requires --start-page)
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Run the SRAM buffer test sequence
    Selftest,

    /// Print the effective driver configuration as TOML
    ShowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x100"), Ok(0x100));
        assert_eq!(parse_hex_u32("0X1f"), Ok(0x1F));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn test_parse_device_args() {
        let cli = Cli::try_parse_from([
            "dataflash",
            "--density",
            "at45db161",
            "--busy-wait",
            "post",
            "erase",
            "--start-page",
            "8",
            "--pages",
            "16",
        ])
        .unwrap();
        assert_eq!(cli.device.density, Density::Mbit16);
        assert_eq!(cli.device.busy_wait, Some(BusyWaitArg::Post));
        assert_eq!(cli.device.power_policy(), None);
        assert!(matches!(
            cli.command,
            Commands::Erase {
                start_page: Some(8),
                pages: Some(16)
            }
        ));
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::try_parse_from(["dataflash", "probe", "--power-save", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.device.power_policy(),
            Some(PowerPolicy::SleepBetweenOperations)
        );
        assert_eq!(cli.device.density, Density::Mbit4);
    }
}
