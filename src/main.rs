//! Main entry point for sheetsync CLI

use clap::Parser;
use sheetsync::cli::Cli;
use sheetsync::commands::{execute_command, Overrides};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence over the default level
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let overrides = Overrides::from_cli(&cli);
    if let Err(e) = execute_command(cli.command, &overrides) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
