//! # Topology Document Loading
//!
//! Locates and parses the compose-style YAML document describing the stack.
//!
//! ## Discovery
//!
//! When no `--file` is given, the working directory is searched for, in order:
//! `compose.yml`, `compose.yaml`, `docker-compose.yml`, `docker-compose.yaml`.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let path = resolve_topology_path(None, Path::new("."))?;
//! let document = read_document(&path)?;
//! println!("{} services", document.services.map(|s| s.len()).unwrap_or(0));
//! ```

mod document;

pub use document::{
    ComposeDocument, RawBuild, RawDependsOn, RawEnvironment, RawService, RawVolume,
};

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

/// File names tried, in order, when discovering a topology document
pub const COMPOSE_FILE_CANDIDATES: [&str; 4] = [
    "compose.yml",
    "compose.yaml",
    "docker-compose.yml",
    "docker-compose.yaml",
];

/// Find a compose file in a directory
pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
    COMPOSE_FILE_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}

/// Resolve the topology document path.
///
/// An explicit path must exist; otherwise `dir` is searched with
/// [`find_compose_file`].
pub fn resolve_topology_path(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }),
        None => find_compose_file(dir).ok_or_else(|| ConfigError::NotDiscovered {
            dir: dir.to_path_buf(),
            candidates: COMPOSE_FILE_CANDIDATES.join(", "),
        }),
    }
}

/// Parse a topology document from YAML text
pub fn parse_document(content: &str) -> Result<ComposeDocument, ConfigError> {
    let document: ComposeDocument =
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;

    debug!(
        "Parsed {} service(s)",
        document.services.as_ref().map(|s| s.len()).unwrap_or(0)
    );
    for key in document.extra.keys() {
        debug!("Ignoring top-level key '{}'", key);
    }
    if let Some(services) = &document.services {
        for (name, service) in services.iter() {
            for key in service.extra.keys() {
                debug!("Ignoring services.{}.{}", name, key);
            }
        }
    }

    Ok(document)
}

/// Read and parse a topology document from disk
pub fn read_document(path: &Path) -> Result<ComposeDocument, ConfigError> {
    debug!("Reading topology from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&content)
}

/// The two-tier stack shipped as `docker-compose.yml` at the repository root
#[cfg(test)]
pub(crate) const CANONICAL_TOPOLOGY: &str = include_str!("../../docker-compose.yml");
