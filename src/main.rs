//! Cockpit agent CLI entry point.

use clap::Parser;

use cockpit_agent::cli::commands::{self, load_config};
use cockpit_agent::cli::{handle_error, Cli, Commands};
use cockpit_agent::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Ask(args) => commands::ask::execute(args, &config, cli.json).await,
        Commands::Classify(args) => commands::classify::execute(args, &config, cli.json).await,
        Commands::Check(args) => commands::check::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
