//! CLI definitions for stackplan
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "stackplan",
    version,
    about = "Validator and start-order planner for compose-style service topologies",
    long_about = "Loads a compose-style topology, validates it, and reports start order,\nresolved environments and application-to-database wiring.\nNever starts, stops, builds or pulls anything."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Topology file (default: discover compose.yml / docker-compose.yml in the working directory)
    #[arg(short, long, global = true, env = "STACKPLAN_FILE")]
    pub file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the topology and report every violation
    Validate,

    /// Show the dependency-respecting start order
    Plan {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show the resolved environment of a service
    Env {
        /// Service name
        service: String,

        /// Output format: text, json or dotenv
        #[arg(long, default_value = "text")]
        format: String,

        /// Print the database connection URL derived from POSTGRES_* instead
        #[arg(long)]
        database_url: bool,
    },

    /// Print the normalized topology as YAML
    Config,

    /// Check that database consumers are wired to the database service
    Check {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Wait until a service's published port accepts TCP connections
    Wait {
        /// Service name
        service: String,

        /// Host the published port is reachable on
        #[arg(long, env = "STACKPLAN_PROBE_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Delay between attempts (e.g. 2s, 500ms)
        #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
        interval: Duration,

        /// Maximum attempts (0 = retry until reachable)
        #[arg(long, default_value = "30")]
        attempts: u32,

        /// Per-attempt connect timeout (e.g. 10s)
        #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },
}
