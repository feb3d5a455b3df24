//! Readiness probe
//!
//! Ordering guarantees only that a dependency was started. This probe is the
//! explicit, opt-in way to wait until a published port accepts TCP
//! connections. It is never run as part of planning.

use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::domain::Topology;
use crate::error::{ProbeError, StackError};

/// Probe retry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Delay between attempts (default: 2s)
    pub interval: Duration,
    /// Maximum attempts; 0 retries until the port answers (default: 30)
    pub max_attempts: u32,
    /// Per-attempt connect timeout (default: 10s)
    pub connect_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Address of a service's first published TCP port on `host`
pub fn probe_address(topology: &Topology, service: &str, host: &str) -> Result<String, StackError> {
    let definition = topology.require_service(service)?;
    let port = definition
        .first_published_tcp_port()
        .ok_or_else(|| ProbeError::NoPublishedPort {
            service: service.to_string(),
        })?;
    Ok(format!("{}:{}", host, port))
}

/// Wait until `address` accepts a TCP connection.
///
/// Returns the number of attempts it took.
pub async fn wait_for_tcp(address: &str, config: &ProbeConfig) -> Result<u32, ProbeError> {
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => {
                info!("✓ {} is accepting connections", address);
                return Ok(attempt);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("connect timed out after {:?}", config.connect_timeout),
        };

        if config.max_attempts > 0 && attempt >= config.max_attempts {
            return Err(ProbeError::Unreachable {
                address: address.to_string(),
                attempts: attempt,
                message: error,
            });
        }

        warn!(
            "{} is unavailable (attempt {}/{}): {} - retrying in {:?}",
            address,
            attempt,
            if config.max_attempts == 0 {
                "∞".to_string()
            } else {
                config.max_attempts.to_string()
            },
            error,
            config.interval
        );
        tokio::time::sleep(config.interval).await;
    }
}
