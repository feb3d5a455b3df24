//! Config command - normalized topology as YAML

use anyhow::{Context, Result};
use std::path::Path;

use super::load_topology;
use crate::domain::Topology;

pub fn render(topology: &Topology) -> Result<String> {
    serde_yaml::to_string(topology).context("Failed to serialize topology")
}

pub fn execute(path: &Path) -> Result<()> {
    let topology = load_topology(path)?;
    print!("{}", render(&topology)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CANONICAL_TOPOLOGY;

    #[test]
    fn test_render_normalized_topology() {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();
        let yaml = render(&topology).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        let services = value["services"].as_sequence().unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0]["name"].as_str(), Some("app"));
        assert_eq!(services[0]["source"]["build"]["context"].as_str(), Some("."));
        assert_eq!(services[1]["source"]["image"].as_str(), Some("postgres:15"));
        assert_eq!(services[1]["ports"][0]["external"].as_u64(), Some(5432));
        assert_eq!(services[1]["volumes"][0]["type"].as_str(), Some("volume"));
        assert_eq!(services[1]["volumes"][0]["source"].as_str(), Some("pgdata"));
        assert_eq!(
            services[1]["volumes"][0]["target"].as_str(),
            Some("/var/lib/postgresql/data")
        );
        assert_eq!(value["volumes"][0]["name"].as_str(), Some("pgdata"));
    }
}
