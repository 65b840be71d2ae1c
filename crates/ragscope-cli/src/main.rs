//! Ragscope CLI
//!
//! Ask questions over a PDF report corpus and inspect request telemetry.

use anyhow::Result;
use clap::Parser;
use ragscope_core::error::exit_codes;
use ragscope_core::{Config, RagScopeError};

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; --verbose raises the default level, RUST_LOG
    // still overrides
    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    let config = Config::default();

    let result = match cli.command {
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format).await,
        Commands::Rate(args) => commands::rate::run(args, &config),
        Commands::Log(args) => commands::log::run(args, &config, cli.format),
        Commands::Status => commands::status::run(&config, cli.format),
    };

    if let Err(error) = result {
        eprintln!("Error: {}", error);
        let code = error
            .downcast_ref::<RagScopeError>()
            .map(RagScopeError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }

    Ok(())
}
