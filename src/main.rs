//! llmcontext - Concatenate a project into a single context document for an LLM
//!
//! llmcontext provides:
//! - Default, .gitignore and user exclusion patterns with directory pruning
//! - Text/binary classification with lossy decoding
//! - Image and audio metadata for binary files
//! - Token estimation with an optional budget

use anyhow::Result;
use clap::Parser;

mod backends;
mod cli;
mod core;
mod flows;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::run(cli)
}
