//! Validate command
//!
//! Loads the topology and lists every violated invariant at once.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use crate::domain::{ServiceSource, Topology};
use crate::error::StackError;
use crate::ui;

pub fn execute(path: &Path) -> Result<()> {
    info!("🔍 Validating {}", path.display());

    let topology = match Topology::load(path) {
        Ok(topology) => topology,
        Err(StackError::Topology(err)) if !err.violations().is_empty() => {
            for violation in err.violations() {
                ui::print_error(&violation.to_string());
            }
            bail!(
                "Topology {} is invalid ({} violation(s))",
                path.display(),
                err.violations().len()
            );
        }
        Err(err) => return Err(err.into()),
    };

    for line in summary(&topology) {
        println!("{}", line);
    }
    ui::print_success(&format!("{} is valid", path.display()));
    Ok(())
}

/// One line per service and volume
pub fn summary(topology: &Topology) -> Vec<String> {
    let mut lines = Vec::new();
    for service in topology.services() {
        let source = match &service.source {
            ServiceSource::Build { context, .. } => format!("build {}", context),
            ServiceSource::Image(image) => format!("image {}", image),
        };
        let ports: Vec<String> = service.ports.iter().map(|p| p.to_string()).collect();
        lines.push(format!(
            "  service {:<12} {:<24} ports [{}]",
            service.name,
            source,
            ports.join(", ")
        ));
    }
    for volume in topology.volumes() {
        lines.push(format!("  volume  {}", volume.name));
    }
    lines
}
