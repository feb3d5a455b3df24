//! Check command
//!
//! Lints the application-to-database wiring and reports the known
//! ordering-without-readiness gap without trying to fix it.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use super::{load_topology, OutputFormat};
use crate::services::connectivity;
use crate::ui;

pub fn execute(path: &Path, format: &str) -> Result<()> {
    let topology = load_topology(path)?;
    let findings = connectivity::check(&topology);
    info!("{} connectivity finding(s)", findings.len());

    match OutputFormat::from_str(format) {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&findings).context("Failed to serialize findings")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for finding in &findings {
                ui::print_finding(finding.severity, &finding.service, &finding.message);
            }
        }
    }

    let errors = connectivity::error_count(&findings);
    if errors > 0 {
        bail!("{} connectivity error(s) in {}", errors, path.display());
    }

    if OutputFormat::from_str(format) == OutputFormat::Text {
        ui::print_success("Database consumers are wired consistently");
    }
    Ok(())
}
