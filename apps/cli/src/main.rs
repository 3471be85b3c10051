//! docweave CLI: build a static documentation site from markdown lessons.
//!
//! Reads a directory of markdown files and writes one HTML page per file,
//! plus a site index, a table of contents and a search index.

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
