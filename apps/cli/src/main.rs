//! offliner CLI: make folders of static HTML pages work without a network.
//!
//! Downloads web fonts and remote images next to the pages and rewrites the
//! pages to reference the local copies.

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
