use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::config::cmd_config;
use super::env::CliArgs;
use super::run::cmd_run;
use super::runtime::{init_logging, load_config, load_local_env_overrides};
use super::selectors::cmd_selectors;

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref())?;

    info!("Starting WebPilot v{}", env!("CARGO_PKG_VERSION"));
    let loaded = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args, loaded.config).await,
        Commands::Selectors(args) => cmd_selectors(args, &loaded.config),
        Commands::Config(args) => cmd_config(args, &loaded),
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {err:#}");
            Err(err)
        }
    }
}
