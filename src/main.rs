use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod services;
mod ui;

use cli::{Cli, Commands};
use commands::{check, env, plan, show, validate, wait};
use services::ProbeConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .with_writer(std::io::stderr)
        .init();

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let path = config::resolve_topology_path(cli.file.as_deref(), &cwd)?;

    match cli.command {
        Commands::Validate => validate::execute(&path)?,
        Commands::Plan { format } => plan::execute(&path, &format)?,
        Commands::Env {
            service,
            format,
            database_url,
        } => env::execute(&path, &service, &format, database_url)?,
        Commands::Config => show::execute(&path)?,
        Commands::Check { format } => check::execute(&path, &format)?,
        Commands::Wait {
            service,
            host,
            interval,
            attempts,
            timeout,
        } => {
            let probe = ProbeConfig {
                interval,
                max_attempts: attempts,
                connect_timeout: timeout,
            };
            wait::execute(&path, &service, &host, probe).await?;
        }
    }

    Ok(())
}
