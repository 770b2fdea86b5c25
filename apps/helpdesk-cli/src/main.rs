//! Helpdesk CLI - normalize task exports and compute dashboard metrics

use anyhow::{Context, Result};
use clap::Parser;
use helpdesk_cli::{resolve_config, run, Cli};
use helpdesk_core::init_tracing;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    init_tracing(&config.logging).context("Failed to initialize logging")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &config, &mut out)
}
