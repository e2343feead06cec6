//! Keywarden CLI entry point.

use anyhow::Context;
use clap::Parser;

use keywarden::cli::commands::{list, rotate_key, verify};
#[cfg(unix)]
use keywarden::cli::commands::{receive, send};
use keywarden::cli::{Cli, Commands};
use keywarden::infrastructure::config::ConfigLoader;
use keywarden::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load_from_dir(&cli.project_dir)
        .with_context(|| format!("failed to load configuration from {}", cli.project_dir.display()))
    {
        Ok(config) => config,
        Err(err) => keywarden::cli::handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => keywarden::cli::handle_error(err, cli.json),
    };

    let project_dir = cli.project_dir.as_path();
    let result = match cli.command {
        Commands::List(args) => list::execute(args, project_dir, config, cli.json),
        Commands::Verify(args) => verify::execute(args, project_dir, config, cli.json),
        Commands::RotateKey(args) => rotate_key::execute(args, project_dir, config, cli.json),
        #[cfg(unix)]
        Commands::Send(args) => send::execute(args, project_dir, config, cli.json).await,
        #[cfg(unix)]
        Commands::Receive(args) => receive::execute(args, project_dir, config, cli.json).await,
    };

    if let Err(err) = result {
        keywarden::cli::handle_error(err, cli.json);
    }
}
