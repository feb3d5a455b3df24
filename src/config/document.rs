//! Raw compose document structures.
//!
//! These types mirror the YAML one-to-one and perform no validation beyond
//! shape. Mappings keep declaration order and duplicate keys so the topology
//! validator can report them instead of losing them to a `HashMap`.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Mapping that preserves declaration order and duplicate keys
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedMap::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
    }
}

/// Top-level compose document
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeDocument {
    /// Declared services, in document order
    #[serde(default)]
    pub services: Option<OrderedMap<RawService>>,

    /// Declared named volumes, in document order
    #[serde(default)]
    pub volumes: Option<OrderedMap<Option<RawVolume>>>,

    /// Everything else (`version`, `networks`, `x-*` extensions, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One entry under `services:`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawService {
    /// Local build source
    #[serde(default)]
    pub build: Option<RawBuild>,

    /// Pre-built image reference (engine:tag)
    #[serde(default)]
    pub image: Option<String>,

    /// Port exposure, "external:internal" or bare "internal"
    #[serde(default)]
    pub ports: Vec<RawPort>,

    /// Runtime environment
    #[serde(default)]
    pub environment: Option<RawEnvironment>,

    /// Start-order dependencies
    #[serde(default)]
    pub depends_on: Option<RawDependsOn>,

    /// Volume mounts, "volume:/path"
    #[serde(default)]
    pub volumes: Vec<String>,

    /// Keys this tool does not interpret (`restart`, `networks`, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// `build: .` or `build: { context: ., dockerfile: Dockerfile }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawBuild {
    Context(String),
    Detailed {
        #[serde(default = "default_build_context")]
        context: String,
        #[serde(default)]
        dockerfile: Option<String>,
    },
}

fn default_build_context() -> String {
    ".".to_string()
}

/// A port entry; YAML reads `- 8000` as a number and `- "8000:8000"` as text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPort {
    Number(u64),
    Text(String),
}

impl fmt::Display for RawPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// `environment:` as a list of `NAME=VALUE` or as a mapping
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawEnvironment {
    List(Vec<String>),
    Map(OrderedMap<serde_yaml::Value>),
}

/// `depends_on:` as a list of names or as a mapping with conditions
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawDependsOn {
    List(Vec<String>),
    Map(OrderedMap<Option<RawDependency>>),
}

/// Long-form dependency entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDependency {
    #[serde(default)]
    pub condition: Option<String>,
}

/// One entry under top-level `volumes:`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawVolume {
    #[serde(default)]
    pub driver: Option<String>,

    #[serde(default)]
    pub external: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_map_keeps_order_and_duplicates() {
        let map: OrderedMap<u32> = serde_yaml::from_str("b: 1\na: 2\nb: 3\n").unwrap();
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "b"]);
    }

    #[test]
    fn test_environment_list_and_map_forms() {
        let list: RawEnvironment = serde_yaml::from_str("- A=1\n- B=\n").unwrap();
        assert_eq!(
            list,
            RawEnvironment::List(vec!["A=1".to_string(), "B=".to_string()])
        );

        let map: RawEnvironment = serde_yaml::from_str("A: 1\nB:\nC: text\n").unwrap();
        match map {
            RawEnvironment::Map(entries) => {
                assert_eq!(entries.len(), 3);
                assert_eq!(entries.0[1].1, serde_yaml::Value::Null);
            }
            other => panic!("expected map form, got {:?}", other),
        }
    }

    #[test]
    fn test_build_short_and_long_forms() {
        let short: RawBuild = serde_yaml::from_str(".").unwrap();
        assert_eq!(short, RawBuild::Context(".".to_string()));

        let long: RawBuild = serde_yaml::from_str("dockerfile: Dockerfile.prod").unwrap();
        assert_eq!(
            long,
            RawBuild::Detailed {
                context: ".".to_string(),
                dockerfile: Some("Dockerfile.prod".to_string()),
            }
        );
    }

    #[test]
    fn test_ports_accept_numbers_and_strings() {
        let ports: Vec<RawPort> = serde_yaml::from_str("- 8000\n- \"5432:5432\"\n").unwrap();
        assert_eq!(ports[0], RawPort::Number(8000));
        assert_eq!(ports[1].to_string(), "5432:5432");
    }

    #[test]
    fn test_depends_on_long_form() {
        let deps: RawDependsOn =
            serde_yaml::from_str("db:\n  condition: service_healthy\ncache:\n").unwrap();
        match deps {
            RawDependsOn::Map(entries) => {
                assert_eq!(entries.0[0].0, "db");
                assert_eq!(
                    entries.0[0].1.as_ref().and_then(|d| d.condition.as_deref()),
                    Some("service_healthy")
                );
                assert!(entries.0[1].1.is_none());
            }
            other => panic!("expected map form, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keys_are_collected() {
        let svc: RawService =
            serde_yaml::from_str("image: postgres:15\nrestart: always\n").unwrap();
        assert!(svc.extra.contains_key("restart"));
        assert_eq!(svc.image.as_deref(), Some("postgres:15"));
    }
}
