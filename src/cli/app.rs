use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::env::CliArgs;
use super::rules::{cmd_check_url, cmd_rules};
use super::runtime::init_logging;
use super::serve::cmd_serve;
use crate::config::load_config;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;

    info!("Starting speak-gateway v{}", env!("CARGO_PKG_VERSION"));

    let loaded = load_config(cli.config.as_deref())?;

    let outcome = match cli.command.clone() {
        Commands::Serve(args) => cmd_serve(args, loaded).await,
        Commands::CheckUrl(args) => cmd_check_url(args, &loaded.config),
        Commands::Rules => cmd_rules(&loaded.config),
    };

    match outcome {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
