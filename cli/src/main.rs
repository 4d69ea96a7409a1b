//! `docrag`: ingest documents into a vector collection and search them.

mod args;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use docrag_retrieval::RetrievalConfig;
use tracing_subscriber::{EnvFilter, fmt};

use crate::args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RetrievalConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    commands::run(cli, config).await
}
