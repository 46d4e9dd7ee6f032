//! `neural` binary entry point.

use anyhow::Result;
use clap::Parser;
use neural_cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    neural_cli::run(CliArgs::parse()).await?;
    Ok(())
}
