//! LexForge CLI — corpus curation for model training.
//!
//! Cleans, scores, filters, and deduplicates raw text documents into a
//! training-ready corpus.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
