//! Centralized error types for stackplan
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for stackplan operations
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Readiness probe error: {0}")]
    Probe(#[from] ProbeError),
}

/// Errors reading or parsing the topology document
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Topology file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("No compose file found in {dir} (tried: {candidates})")]
    NotDiscovered { dir: PathBuf, candidates: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse topology document: {message}")]
    ParseError { message: String },
}

/// A single broken invariant found while validating a topology
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("services.{service}.depends_on: unknown service '{dependency}'")]
    UnknownDependency { service: String, dependency: String },

    #[error("services.{service}.volumes: unknown volume '{volume}'")]
    UnknownVolume { service: String, volume: String },

    #[error("services.{second}.ports: external port {port} already published by service '{first}'")]
    DuplicatePort {
        port: String,
        first: String,
        second: String,
    },

    #[error("services.{service}.environment: duplicate key '{key}'")]
    DuplicateEnvKey { service: String, key: String },

    #[error("services: dependency cycle between {}", .services.join(" -> "))]
    DependencyCycle { services: Vec<String> },

    #[error("services.{service}: neither 'build' nor 'image' is set")]
    MissingSource { service: String },

    #[error("services.{service}.image: invalid image reference '{value}'")]
    InvalidImage { service: String, value: String },

    #[error("services.{service}.ports: invalid port mapping '{value}': {reason}")]
    InvalidPort {
        service: String,
        value: String,
        reason: String,
    },

    #[error("services.{service}.volumes: invalid mount '{value}': {reason}")]
    InvalidMount {
        service: String,
        value: String,
        reason: String,
    },

    #[error("services.{service}.environment: invalid entry '{entry}'")]
    InvalidEnvEntry { service: String, entry: String },

    #[error("services.{service}.depends_on: invalid condition '{condition}' for '{dependency}'")]
    InvalidCondition {
        service: String,
        dependency: String,
        condition: String,
    },

    #[error("services: invalid service name '{name}'")]
    InvalidServiceName { name: String },

    #[error("services: duplicate service '{name}'")]
    DuplicateService { name: String },

    #[error("volumes: duplicate volume '{name}'")]
    DuplicateVolume { name: String },
}

/// Topology validation and lookup errors
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("{} violation(s):\n{}", .violations.len(), format_violations(.violations))]
    Invalid { violations: Vec<Violation> },

    #[error("Service not declared: {name}")]
    UnknownService { name: String },
}

impl TopologyError {
    /// Violations carried by an `Invalid` error, empty otherwise
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Invalid { violations } => violations,
            Self::UnknownService { .. } => &[],
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Readiness probe errors
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Service {service} publishes no external port")]
    NoPublishedPort { service: String },

    #[error("{address} not reachable after {attempts} attempts: {message}")]
    Unreachable {
        address: String,
        attempts: u32,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display_names_entity() {
        let err = Violation::UnknownVolume {
            service: "db".to_string(),
            volume: "pgdata".to_string(),
        };
        assert_eq!(err.to_string(), "services.db.volumes: unknown volume 'pgdata'");
    }

    #[test]
    fn test_cycle_display_lists_services() {
        let err = Violation::DependencyCycle {
            services: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("a -> b"));
    }

    #[test]
    fn test_invalid_topology_lists_every_violation() {
        let err = TopologyError::Invalid {
            violations: vec![
                Violation::MissingSource {
                    service: "app".to_string(),
                },
                Violation::DuplicateVolume {
                    name: "pgdata".to_string(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 violation(s)"));
        assert!(text.contains("services.app"));
        assert!(text.contains("volumes: duplicate volume 'pgdata'"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_error_conversion() {
        let err: StackError = ProbeError::NoPublishedPort {
            service: "db".to_string(),
        }
        .into();
        assert!(matches!(err, StackError::Probe(_)));
    }
}
