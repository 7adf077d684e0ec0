use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path (defaults to config/gateway.yaml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level; RUST_LOG takes precedence
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}
