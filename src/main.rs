//! dataflash - AT45DB DataFlash driver front end
//!
//! Runs the interrupt-driven Transfer Engine and the DataFlash command layer
//! against an emulated part, optionally backed by an image file.
//!
//! # Architecture
//!
//! - `dataflash-core`: bus abstraction, Transfer Engine, opcodes, status and
//!   geometry decoding, and the `DataFlash` driver with its wait and power
//!   policies
//! - `dataflash-sim`: an AT45DB part emulated behind a `SerialBus`
//! - this binary: command line parsing, progress display and image handling

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Session;
use dataflash_core::config::DriverConfig;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = config;
    if let Some(policy) = cli.device.busy_wait {
        config = config.with_busy_wait_policy(policy.into());
    }
    if let Some(policy) = cli.device.power_policy() {
        config = config.with_power_policy(policy);
    }
    log::debug!("driver config: {:?}", config);

    if let Commands::ShowConfig = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let mut session = Session::open(&cli.device, config)?;

    let result = match cli.command {
        Commands::Probe => commands::run_probe(&mut session),
        Commands::Read {
            output,
            start,
            length,
        } => commands::run_read(&mut session, &output, start, length),
        Commands::Write {
            input,
            start_page,
            verify,
        } => commands::run_write(&mut session, &input, start_page, verify)
            .and_then(|()| session.save()),
        Commands::Erase { start_page, pages } => {
            commands::run_erase(&mut session, start_page, pages).and_then(|()| session.save())
        }
        Commands::Selftest => {
            commands::run_selftest(&mut session).and_then(|()| session.save())
        }
        Commands::ShowConfig => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Load the driver configuration from a file, or fall back to the defaults
fn load_config(path: Option<&Path>) -> Result<DriverConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            log::info!("Loading configuration from {:?}", path);
            Ok(DriverConfig::from_toml_file(path)?)
        }
        None => Ok(DriverConfig::default()),
    }
}
