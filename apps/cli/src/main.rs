//! Glimpse CLI: annotate search results with AI summaries.
//!
//! Reads a saved result page, asks the summarization service about every
//! result, and prints each result with its revealed summary.

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
