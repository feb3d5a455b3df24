//! Connectivity check - application-to-database contract lint
//!
//! Any service whose environment carries `POSTGRES_HOST` is treated as a
//! database consumer. Its `POSTGRES_*` values must line up with what the
//! target database service is configured with, or connections fail at
//! runtime long after the topology was accepted.

use serde::Serialize;
use std::fmt;

use crate::domain::environment::{
    self, POSTGRES_DB, POSTGRES_HOST, POSTGRES_PASSWORD, POSTGRES_PORT, POSTGRES_USER,
};
use crate::domain::{ServiceDefinition, Topology};

/// Default superuser of the postgres image when `POSTGRES_USER` is unset
const IMAGE_DEFAULT_USER: &str = "postgres";

/// Port the postgres image listens on inside the network
const IMAGE_DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A single connectivity finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// Consumer service the finding is about
    pub service: String,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, service: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            service: service.to_string(),
            message: message.into(),
        }
    }
}

/// Number of fatal findings
pub fn error_count(findings: &[Finding]) -> usize {
    findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count()
}

/// Check every database consumer in the topology
pub fn check(topology: &Topology) -> Vec<Finding> {
    topology
        .services()
        .iter()
        .filter(|s| s.env(POSTGRES_HOST).is_some())
        .flat_map(|consumer| check_consumer(topology, consumer))
        .collect()
}

fn check_consumer(topology: &Topology, consumer: &ServiceDefinition) -> Vec<Finding> {
    let mut findings = Vec::new();
    let env = environment::resolve(consumer);
    let name = consumer.name.as_str();
    let host = env.get(POSTGRES_HOST).unwrap_or_default();

    let Some(target) = topology.service(host) else {
        findings.push(Finding::new(
            Severity::Error,
            name,
            format!("{} '{}' is not a declared service", POSTGRES_HOST, host),
        ));
        return findings;
    };
    let target_env = environment::resolve(target);

    match env.get(POSTGRES_PORT).map(str::parse::<u16>) {
        None => {}
        Some(Ok(port)) if accepts_port(target, port) => {}
        Some(Ok(port)) => findings.push(Finding::new(
            Severity::Warning,
            name,
            format!("{}={} is not a port service '{}' listens on", POSTGRES_PORT, port, host),
        )),
        Some(Err(_)) => findings.push(Finding::new(
            Severity::Error,
            name,
            format!(
                "{}='{}' is not a port number",
                POSTGRES_PORT,
                env.get(POSTGRES_PORT).unwrap_or_default()
            ),
        )),
    }

    let target_user = target_env.get(POSTGRES_USER).unwrap_or(IMAGE_DEFAULT_USER);
    let target_db = target_env.get(POSTGRES_DB).unwrap_or(target_user);
    let expected = [
        (POSTGRES_DB, Some(target_db)),
        (POSTGRES_USER, Some(target_user)),
        (POSTGRES_PASSWORD, target_env.get(POSTGRES_PASSWORD)),
    ];
    for (key, target_value) in expected {
        let (Some(value), Some(target_value)) = (env.get(key), target_value) else {
            continue;
        };
        if value != target_value {
            let shown = if key == POSTGRES_PASSWORD {
                "differs".to_string()
            } else {
                format!("'{}' differs from '{}'", value, target_value)
            };
            findings.push(Finding::new(
                Severity::Error,
                name,
                format!("{} {} on service '{}'", key, shown, host),
            ));
        }
    }

    match consumer.depends_on(host) {
        None => findings.push(Finding::new(
            Severity::Warning,
            name,
            format!("does not depend on '{}'; start order is unconstrained", host),
        )),
        Some(dependency) if !dependency.condition.gates_readiness() => {
            findings.push(Finding::new(
                Severity::Notice,
                name,
                format!(
                    "starts after '{}' is started, not after it accepts connections; \
                     connection retries are up to the application",
                    host
                ),
            ))
        }
        Some(_) => {}
    }

    findings
}

fn is_postgres_image(service: &ServiceDefinition) -> bool {
    service
        .image()
        .and_then(|image| image.name.rsplit('/').next())
        .map_or(false, |repository| repository == "postgres")
}

/// Whether `port` reaches the target from inside the private network.
///
/// `ports:` only controls host publishing. A postgres image always listens on
/// its default port, and a target of unknown image without any `ports:` gives
/// nothing to compare against.
fn accepts_port(target: &ServiceDefinition, port: u16) -> bool {
    let postgres = is_postgres_image(target);
    if postgres && port == IMAGE_DEFAULT_PORT {
        return true;
    }
    if !postgres && target.ports.is_empty() {
        return true;
    }
    target.exposes_internal_port(port)
}
