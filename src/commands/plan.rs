//! Plan command
//!
//! Prints the start order, the waves that may start concurrently, and every
//! dependency edge with its start condition.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::{load_topology, OutputFormat};
use crate::domain::{sequencer, StartCondition, Topology};
use crate::ui;

#[derive(Debug, Clone, Serialize)]
pub struct StartPlan {
    pub order: Vec<String>,
    pub waves: Vec<Vec<String>>,
    pub edges: Vec<PlanEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEdge {
    pub service: String,
    pub depends_on: String,
    pub condition: StartCondition,
}

impl StartPlan {
    pub fn from_topology(topology: &Topology) -> Self {
        let owned = |names: Vec<&str>| -> Vec<String> {
            names.into_iter().map(str::to_string).collect()
        };

        let edges = topology
            .start_order()
            .into_iter()
            .flat_map(|service| {
                service.depends_on.iter().map(move |dep| PlanEdge {
                    service: service.name.clone(),
                    depends_on: dep.service.clone(),
                    condition: dep.condition,
                })
            })
            .collect();

        Self {
            order: owned(sequencer::start_order(topology)),
            waves: sequencer::start_waves(topology)
                .into_iter()
                .map(owned)
                .collect(),
            edges,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Start order:\n");
        for (i, name) in self.order.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, name));
        }

        out.push_str("Waves:\n");
        for (i, wave) in self.waves.iter().enumerate() {
            out.push_str(&format!("  {}: {}\n", i + 1, wave.join(", ")));
        }

        if !self.edges.is_empty() {
            out.push_str("Edges:\n");
            for edge in &self.edges {
                let note = if edge.condition.gates_readiness() {
                    ""
                } else {
                    " (ordering only, no readiness gate)"
                };
                out.push_str(&format!(
                    "  {} -> {} [{}]{}\n",
                    edge.service,
                    edge.depends_on,
                    condition_name(edge.condition),
                    note
                ));
            }
        }
        out
    }
}

fn condition_name(condition: StartCondition) -> &'static str {
    match condition {
        StartCondition::ServiceStarted => "service_started",
        StartCondition::ServiceHealthy => "service_healthy",
        StartCondition::ServiceCompletedSuccessfully => "service_completed_successfully",
    }
}

pub fn execute(path: &Path, format: &str) -> Result<()> {
    let topology = load_topology(path)?;
    let plan = StartPlan::from_topology(&topology);

    match OutputFormat::from_str(format) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            ui::print_header(&format!("Start plan: {}", path.display()));
            print!("{}", plan.render_text());
            println!();
            println!(
                "{}",
                "Order guarantees start initiation only, not readiness.".dimmed()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CANONICAL_TOPOLOGY;

    #[test]
    fn test_canonical_plan() {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();
        let plan = StartPlan::from_topology(&topology);
        assert_eq!(plan.order, vec!["db", "app"]);
        assert_eq!(plan.waves, vec![vec!["db"], vec!["app"]]);
        assert_eq!(plan.edges.len(), 1);
        assert_eq!(plan.edges[0].service, "app");
        assert_eq!(plan.edges[0].depends_on, "db");
    }

    #[test]
    fn test_text_flags_ordering_only_edges() {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();
        let text = StartPlan::from_topology(&topology).render_text();
        assert!(text.contains("  1. db\n  2. app\n"));
        assert!(text.contains("app -> db [service_started] (ordering only, no readiness gate)"));
    }

    #[test]
    fn test_json_shape() {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();
        let plan = StartPlan::from_topology(&topology);
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["order"], serde_json::json!(["db", "app"]));
        assert_eq!(value["edges"][0]["condition"], "service_started");
    }
}
