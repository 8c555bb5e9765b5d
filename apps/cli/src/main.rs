//! LeadMerge CLI — merge lead exports from many providers into one set.
//!
//! Loads provider JSON files, deduplicates them by email or name+org,
//! optionally drops already-contacted leads, and writes the merged set.

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
