//! Command-line flags

use std::path::PathBuf;

use clap::Parser;

/// Terminal client for the keeper server
#[derive(Debug, Default, Clone, Parser)]
#[command(name = "keeper-client", version, about)]
pub struct Cli {
    /// Path to a TOML or JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server address, with or without an http:// prefix
    #[arg(short, long, value_name = "HOST:PORT")]
    pub address: Option<String>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}
