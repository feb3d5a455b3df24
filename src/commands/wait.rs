//! Wait command - block until a service's published port answers

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

use super::load_topology;
use crate::services::readiness::{self, ProbeConfig};
use crate::ui;

pub async fn execute(path: &Path, service: &str, host: &str, config: ProbeConfig) -> Result<()> {
    let topology = load_topology(path)?;
    let address = readiness::probe_address(&topology, service, host)?;

    info!("⏳ Waiting for {} at {}", service, address);
    info!(
        "   Interval: {:?}, attempts: {}, timeout: {:?}",
        config.interval,
        if config.max_attempts == 0 {
            "unlimited".to_string()
        } else {
            config.max_attempts.to_string()
        },
        config.connect_timeout
    );

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Probing {}...", address));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = readiness::wait_for_tcp(&address, &config).await;
    spinner.finish_and_clear();

    let attempts = result?;
    ui::print_success(&format!(
        "{} is accepting connections on {} (attempt {})",
        service, address, attempts
    ));
    Ok(())
}
