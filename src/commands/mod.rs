//! Command implementations, one module per subcommand

pub mod check;
pub mod env;
pub mod plan;
pub mod show;
pub mod validate;
pub mod wait;

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::Topology;

/// Output format shared by reporting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Load and validate the topology, attaching the path to any error
pub fn load_topology(path: &Path) -> Result<Topology> {
    Topology::load(path).with_context(|| format!("Failed to load topology {}", path.display()))
}
