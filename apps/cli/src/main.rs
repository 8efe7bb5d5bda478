//! companyintel CLI: polite company web-presence enrichment.
//!
//! Resolves company names to their official websites, extracts identity
//! signals, classifies industry, and keeps a fresh local record store with a
//! JSON mirror.

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
