use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use xlgrid_core::DocumentCache;
use xlgrid_mcp::{Config, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // stdout carries protocol traffic only.
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log filter [{}]", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::debug!(?config, "configuration");
    let server = Server::new(DocumentCache::with_capacity(config.cache_capacity));
    server
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("stdio transport failed")?;
    Ok(())
}
