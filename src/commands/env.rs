//! Env command - resolved environment of one service

use anyhow::{Context, Result};
use std::path::Path;

use super::load_topology;
use crate::domain::{environment, ResolvedEnvironment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFormat {
    Text,
    Json,
    Dotenv,
}

impl EnvFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "dotenv" | "env" => Self::Dotenv,
            _ => Self::Text,
        }
    }
}

pub fn render(env: &ResolvedEnvironment, format: EnvFormat) -> Result<String> {
    Ok(match format {
        EnvFormat::Json => {
            serde_json::to_string_pretty(env).context("Failed to serialize environment")?
        }
        EnvFormat::Dotenv => env.to_dotenv(),
        EnvFormat::Text => {
            let width = env.keys().map(str::len).max().unwrap_or(0);
            env.iter()
                .map(|(name, value)| format!("{:<width$}  {}\n", name, value, width = width))
                .collect()
        }
    })
}

pub fn execute(path: &Path, service: &str, format: &str, database_url: bool) -> Result<()> {
    let topology = load_topology(path)?;
    let definition = topology.require_service(service)?;
    let env = environment::resolve(definition);

    if database_url {
        println!("{}", env.database_url());
        return Ok(());
    }

    print!("{}", render(&env, EnvFormat::from_str(format))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CANONICAL_TOPOLOGY;
    use crate::domain::Topology;

    fn app_env() -> ResolvedEnvironment {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();
        environment::resolve(topology.service("app").unwrap())
    }

    #[test]
    fn test_render_text_aligns_names() {
        let text = render(&app_env(), EnvFormat::Text).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("POSTGRES_DB        secrets_db\n"));
    }

    #[test]
    fn test_render_json_is_flat_mapping() {
        let json = render(&app_env(), EnvFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["POSTGRES_HOST"], "db");
        assert_eq!(value["POSTGRES_PORT"], "5432");
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_render_dotenv() {
        let text = render(&app_env(), EnvFormat::Dotenv).unwrap();
        assert!(text.starts_with("POSTGRES_DB=secrets_db\n"));
    }
}
