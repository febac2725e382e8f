//! LeadScout CLI: contractor website discovery and lead scoring.
//!
//! Runs resolution batches over a local record database, reports status
//! and manages configuration.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
