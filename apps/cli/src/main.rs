//! Curriculum CLI: outcomes table in, curriculum structure out.
//!
//! Reads a flat outcomes table and turns it into a nested Stage → Area →
//! Focus Area → Content Group → Content Point hierarchy with outcome codes.

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
