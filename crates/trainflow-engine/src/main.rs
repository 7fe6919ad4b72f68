//! Trainflow CLI - Main entry point

use clap::Parser;
use std::process;
use trainflow_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use trainflow_engine::{cli::Cli, config::Config};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("trainflow")
        .filter_directives(if cli.verbose {
            "trainflow_engine=debug,sqlx=info"
        } else {
            "trainflow_engine=warn,sqlx=warn"
        })
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring invalid logging environment: {e}");
        LogConfig::default()
    });
    let _guard = init_logging(&log_config).ok().flatten();

    let result = match Config::load() {
        Ok(config) => trainflow_engine::cli::execute(cli, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
