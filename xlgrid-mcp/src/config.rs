use std::num::NonZeroUsize;

use clap::Parser;

/// MCP server exposing xlsx sheets as capped 50x50 windows over stdio.
#[derive(Debug, Parser)]
#[command(name = "xlgrid-mcp", version, about)]
pub struct Config {
    /// Log filter directive, e.g. `info` or `xlgrid_core=debug`. Logs go to stderr.
    #[arg(long, env = "XLGRID_LOG", default_value = "info")]
    pub log_level: String,

    /// Keep at most this many workbooks open, dropping the least recently used.
    /// Unbounded when unset.
    #[arg(long, env = "XLGRID_CACHE_CAPACITY")]
    pub cache_capacity: Option<NonZeroUsize>,
}
