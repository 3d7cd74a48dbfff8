//! sitescribe CLI: mirror a documentation site as a tree of Markdown files.
//!
//! Crawls every page reachable from a start URL on the same origin, renders
//! it, and writes its main content as Markdown under the output directory.

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
