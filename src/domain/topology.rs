//! Topology loading and validation
//!
//! Turns a raw [`ComposeDocument`] into an immutable, validated graph of
//! services and volumes. All violations are collected in one pass so a broken
//! document is reported in full rather than one error at a time.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

use super::sequencer;
use super::service::{
    Dependency, EnvVar, ImageReference, PortMapping, Protocol, ServiceDefinition, ServiceSource,
    StartCondition, VolumeMount,
};
use super::volume::VolumeDefinition;
use crate::config::{
    self, ComposeDocument, RawBuild, RawDependsOn, RawEnvironment, RawService, RawVolume,
};
use crate::error::{StackError, TopologyError, Violation};

const SERVICE_NAME_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$";

fn is_valid_service_name(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(SERVICE_NAME_PATTERN).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(name))
}

/// Validated, immutable service topology
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    services: Vec<ServiceDefinition>,
    volumes: Vec<VolumeDefinition>,
    #[serde(skip)]
    start_order: Vec<usize>,
}

impl Topology {
    /// Load and validate a topology file
    pub fn load(path: &Path) -> Result<Self, StackError> {
        let document = config::read_document(path)?;
        let topology = Self::from_document(&document)?;
        info!(
            "Loaded {} service(s), {} volume(s) from {}",
            topology.services.len(),
            topology.volumes.len(),
            path.display()
        );
        Ok(topology)
    }

    /// Parse and validate topology YAML
    #[cfg(test)]
    pub fn parse(content: &str) -> Result<Self, StackError> {
        let document = config::parse_document(content)?;
        Ok(Self::from_document(&document)?)
    }

    /// Validate a parsed document
    pub fn from_document(document: &ComposeDocument) -> Result<Self, TopologyError> {
        let mut violations = Vec::new();

        let volumes = build_volumes(document, &mut violations);
        let volume_names: HashSet<&str> = volumes.iter().map(|v| v.name.as_str()).collect();

        let raw_services: &[(String, RawService)] = document
            .services
            .as_ref()
            .map(|s| s.0.as_slice())
            .unwrap_or(&[]);

        let mut declared: HashSet<&str> = HashSet::new();
        let mut unique: Vec<(&str, &RawService)> = Vec::new();
        for (name, raw) in raw_services {
            if !is_valid_service_name(name) {
                violations.push(Violation::InvalidServiceName { name: name.clone() });
            }
            if declared.insert(name.as_str()) {
                unique.push((name.as_str(), raw));
            } else {
                violations.push(Violation::DuplicateService { name: name.clone() });
            }
        }

        let services: Vec<ServiceDefinition> = unique
            .into_iter()
            .filter_map(|(name, raw)| build_service(name, raw, &mut violations))
            .collect();

        check_references(&services, &declared, &volume_names, &mut violations);
        check_port_conflicts(&services, &mut violations);

        let start_order = match sequencer::sort(&services) {
            Ok(order) => order,
            Err(cycles) => {
                violations.extend(
                    cycles
                        .into_iter()
                        .map(|services| Violation::DependencyCycle { services }),
                );
                Vec::new()
            }
        };

        if !violations.is_empty() {
            debug!("Topology rejected with {} violation(s)", violations.len());
            return Err(TopologyError::Invalid { violations });
        }

        Ok(Self {
            services,
            volumes,
            start_order,
        })
    }

    /// Services in declaration order
    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    /// Volumes in declaration order
    pub fn volumes(&self) -> &[VolumeDefinition] {
        &self.volumes
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn require_service(&self, name: &str) -> Result<&ServiceDefinition, TopologyError> {
        self.service(name).ok_or_else(|| TopologyError::UnknownService {
            name: name.to_string(),
        })
    }

    /// Services in dependency-respecting start order
    pub fn start_order(&self) -> Vec<&ServiceDefinition> {
        self.start_order.iter().map(|&i| &self.services[i]).collect()
    }

    pub(crate) fn order_indices(&self) -> &[usize] {
        &self.start_order
    }
}

fn build_volumes(document: &ComposeDocument, violations: &mut Vec<Violation>) -> Vec<VolumeDefinition> {
    let mut volumes: Vec<VolumeDefinition> = Vec::new();
    let Some(raw_volumes) = &document.volumes else {
        return volumes;
    };

    for (name, raw) in raw_volumes.iter() {
        if volumes.iter().any(|v| v.name == name) {
            violations.push(Violation::DuplicateVolume {
                name: name.to_string(),
            });
            continue;
        }
        let raw = raw.clone().unwrap_or_else(RawVolume::default);
        volumes.push(VolumeDefinition {
            name: name.to_string(),
            driver: raw.driver,
            external: raw.external.unwrap_or(false),
        });
    }
    volumes
}

fn build_service(name: &str, raw: &RawService, violations: &mut Vec<Violation>) -> Option<ServiceDefinition> {
    let environment = build_environment(name, raw.environment.as_ref(), violations);
    let ports = build_ports(name, raw, violations);
    let depends_on = build_dependencies(name, raw.depends_on.as_ref(), violations);
    let volumes = build_mounts(name, raw, violations);
    let source = build_source(name, raw, violations)?;

    Some(ServiceDefinition {
        name: name.to_string(),
        source,
        environment,
        ports,
        depends_on,
        volumes,
    })
}

fn build_source(name: &str, raw: &RawService, violations: &mut Vec<Violation>) -> Option<ServiceSource> {
    let image = match &raw.image {
        Some(value) => match ImageReference::parse(value) {
            Some(image) => Some(image),
            None => {
                violations.push(Violation::InvalidImage {
                    service: name.to_string(),
                    value: value.clone(),
                });
                return None;
            }
        },
        None => None,
    };

    match (&raw.build, image) {
        (Some(RawBuild::Context(context)), image) => Some(ServiceSource::Build {
            context: context.clone(),
            dockerfile: None,
            image,
        }),
        (Some(RawBuild::Detailed { context, dockerfile }), image) => Some(ServiceSource::Build {
            context: context.clone(),
            dockerfile: dockerfile.clone(),
            image,
        }),
        (None, Some(image)) => {
            if image.tag.is_none() && image.digest.is_none() {
                debug!(
                    "services.{}: no image tag, runtime pulls '{}'",
                    name,
                    image.effective_tag()
                );
            }
            Some(ServiceSource::Image(image))
        }
        (None, None) => {
            violations.push(Violation::MissingSource {
                service: name.to_string(),
            });
            None
        }
    }
}

/// Render a YAML scalar the way the runtime would hand it to the process
fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn build_environment(
    service: &str,
    raw: Option<&RawEnvironment>,
    violations: &mut Vec<Violation>,
) -> Vec<EnvVar> {
    let mut entries: Vec<(String, Option<String>)> = Vec::new();
    match raw {
        None => {}
        Some(RawEnvironment::List(items)) => {
            for item in items {
                // Bare `NAME` carries no value; literal-only resolution makes it empty.
                let (name, value) = item.split_once('=').unwrap_or((item.as_str(), ""));
                entries.push((name.to_string(), Some(value.to_string())));
            }
        }
        Some(RawEnvironment::Map(map)) => {
            for (name, value) in map.iter() {
                entries.push((name.to_string(), scalar_to_string(value)));
            }
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut environment = Vec::new();
    for (name, value) in entries {
        let Some(value) = value.filter(|_| !name.is_empty() && !name.contains(char::is_whitespace))
        else {
            violations.push(Violation::InvalidEnvEntry {
                service: service.to_string(),
                entry: name,
            });
            continue;
        };
        if !seen.insert(name.clone()) {
            violations.push(Violation::DuplicateEnvKey {
                service: service.to_string(),
                key: name,
            });
            continue;
        }
        environment.push(EnvVar { name, value });
    }
    environment
}

fn build_ports(service: &str, raw: &RawService, violations: &mut Vec<Violation>) -> Vec<PortMapping> {
    let mut ports = Vec::new();
    for entry in &raw.ports {
        let text = entry.to_string();
        match PortMapping::parse(&text) {
            Ok(port) => ports.push(port),
            Err(reason) => violations.push(Violation::InvalidPort {
                service: service.to_string(),
                value: text,
                reason,
            }),
        }
    }
    ports
}

fn build_dependencies(
    service: &str,
    raw: Option<&RawDependsOn>,
    violations: &mut Vec<Violation>,
) -> Vec<Dependency> {
    let mut dependencies: Vec<Dependency> = Vec::new();
    let mut push = |dependency: Dependency| {
        if !dependencies.iter().any(|d| d.service == dependency.service) {
            dependencies.push(dependency);
        }
    };

    match raw {
        None => {}
        Some(RawDependsOn::List(names)) => {
            for name in names {
                push(Dependency {
                    service: name.clone(),
                    condition: StartCondition::default(),
                });
            }
        }
        Some(RawDependsOn::Map(map)) => {
            for (name, entry) in map.iter() {
                let condition = match entry.as_ref().and_then(|e| e.condition.as_deref()) {
                    None => StartCondition::default(),
                    Some(text) => match StartCondition::from_str(text) {
                        Some(condition) => condition,
                        None => {
                            violations.push(Violation::InvalidCondition {
                                service: service.to_string(),
                                dependency: name.to_string(),
                                condition: text.to_string(),
                            });
                            continue;
                        }
                    },
                };
                push(Dependency {
                    service: name.to_string(),
                    condition,
                });
            }
        }
    }
    dependencies
}

fn build_mounts(service: &str, raw: &RawService, violations: &mut Vec<Violation>) -> Vec<VolumeMount> {
    let mut mounts = Vec::new();
    for entry in &raw.volumes {
        match VolumeMount::parse(entry) {
            Ok(mount) => mounts.push(mount),
            Err(reason) => violations.push(Violation::InvalidMount {
                service: service.to_string(),
                value: entry.clone(),
                reason,
            }),
        }
    }
    mounts
}

fn check_references(
    services: &[ServiceDefinition],
    declared: &HashSet<&str>,
    volume_names: &HashSet<&str>,
    violations: &mut Vec<Violation>,
) {
    for service in services {
        for dependency in &service.depends_on {
            if !declared.contains(dependency.service.as_str()) {
                violations.push(Violation::UnknownDependency {
                    service: service.name.clone(),
                    dependency: dependency.service.clone(),
                });
            }
        }
        for volume in service.volumes.iter().filter_map(VolumeMount::volume_name) {
            if !volume_names.contains(volume) {
                violations.push(Violation::UnknownVolume {
                    service: service.name.clone(),
                    volume: volume.to_string(),
                });
            }
        }
    }
}

fn check_port_conflicts(services: &[ServiceDefinition], violations: &mut Vec<Violation>) {
    let mut owners: HashMap<(u16, Protocol), &str> = HashMap::new();
    for service in services {
        for port in &service.ports {
            let Some(external) = port.external else {
                continue;
            };
            match owners.get(&(external, port.protocol)) {
                Some(first) => violations.push(Violation::DuplicatePort {
                    port: if port.protocol == Protocol::Tcp {
                        external.to_string()
                    } else {
                        format!("{}/{}", external, port.protocol.as_str())
                    },
                    first: first.to_string(),
                    second: service.name.clone(),
                }),
                None => {
                    owners.insert((external, port.protocol), service.name.as_str());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CANONICAL_TOPOLOGY;
    use crate::domain::service::MountSource;

    fn violations_of(yaml: &str) -> Vec<Violation> {
        match Topology::parse(yaml) {
            Err(StackError::Topology(err)) => err.violations().to_vec(),
            Err(other) => panic!("expected validation failure, got {}", other),
            Ok(_) => panic!("expected validation failure"),
        }
    }

    #[test]
    fn test_canonical_topology_loads() {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();

        let app = topology.service("app").unwrap();
        assert_eq!(
            app.source,
            ServiceSource::Build {
                context: ".".to_string(),
                dockerfile: None,
                image: None,
            }
        );
        assert_eq!(app.ports[0].external, Some(8000));
        assert_eq!(app.ports[0].internal, 8000);
        assert_eq!(app.depends_on[0].service, "db");

        let db = topology.service("db").unwrap();
        match &db.source {
            ServiceSource::Image(image) => assert_eq!(image.to_string(), "postgres:15"),
            other => panic!("db should pull an image, got {:?}", other),
        }
        assert_eq!(db.volumes[0].source, MountSource::Named("pgdata".to_string()));
        assert_eq!(db.volumes[0].target, "/var/lib/postgresql/data");
        assert_eq!(db.env("POSTGRES_DB"), Some("secrets_db"));

        assert_eq!(topology.volumes()[0].name, "pgdata");
    }

    #[test]
    fn test_canonical_start_order() {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();
        let order: Vec<&str> = topology.start_order().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, vec!["db", "app"]);
    }

    #[test]
    fn test_dependency_cycle_rejected() {
        let violations = violations_of(
            r#"
services:
  a:
    image: busybox
    depends_on: [b]
  b:
    image: busybox
    depends_on: [a]
"#,
        );
        assert_eq!(
            violations,
            vec![Violation::DependencyCycle {
                services: vec!["a".to_string(), "b".to_string()],
            }]
        );
    }

    #[test]
    fn test_separate_cycles_reported_together() {
        let violations = violations_of(
            r#"
services:
  a:
    image: busybox
    depends_on: [b]
  b:
    image: busybox
    depends_on: [a]
  c:
    image: busybox
    depends_on: [c]
"#,
        );
        assert_eq!(
            violations,
            vec![
                Violation::DependencyCycle {
                    services: vec!["a".to_string(), "b".to_string()],
                },
                Violation::DependencyCycle {
                    services: vec!["c".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_unknown_volume_names_service_and_volume() {
        let violations = violations_of(
            r#"
services:
  db:
    image: postgres:15
    volumes:
      - pgdata:/var/lib/postgresql/data
"#,
        );
        assert_eq!(
            violations,
            vec![Violation::UnknownVolume {
                service: "db".to_string(),
                volume: "pgdata".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_external_port_names_both_services() {
        let violations = violations_of(
            r#"
services:
  app:
    build: .
    ports: ["8000:8000"]
  admin:
    build: ./admin
    ports: ["8000:9000"]
"#,
        );
        assert_eq!(
            violations,
            vec![Violation::DuplicatePort {
                port: "8000".to_string(),
                first: "app".to_string(),
                second: "admin".to_string(),
            }]
        );
    }

    #[test]
    fn test_same_port_different_protocols_allowed() {
        let topology = Topology::parse(
            r#"
services:
  dns:
    image: coredns/coredns
    ports: ["53:53", "53:53/udp"]
"#,
        )
        .unwrap();
        assert_eq!(topology.services()[0].ports.len(), 2);
    }

    #[test]
    fn test_unknown_dependency() {
        let violations = violations_of(
            r#"
services:
  app:
    build: .
    depends_on: [database]
"#,
        );
        assert_eq!(
            violations,
            vec![Violation::UnknownDependency {
                service: "app".to_string(),
                dependency: "database".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_env_key_list_form() {
        let violations = violations_of(
            r#"
services:
  app:
    build: .
    environment:
      - MODE=a
      - MODE=b
"#,
        );
        assert_eq!(
            violations,
            vec![Violation::DuplicateEnvKey {
                service: "app".to_string(),
                key: "MODE".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_env_key_map_form() {
        let violations = violations_of(
            "services:\n  app:\n    build: .\n    environment:\n      MODE: a\n      MODE: b\n",
        );
        assert!(matches!(
            violations.as_slice(),
            [Violation::DuplicateEnvKey { key, .. }] if key == "MODE"
        ));
    }

    #[test]
    fn test_missing_source_and_invalid_name() {
        let violations = violations_of("services:\n  -bad:\n    ports: [\"80\"]\n");
        assert!(violations.contains(&Violation::InvalidServiceName {
            name: "-bad".to_string()
        }));
        assert!(violations.contains(&Violation::MissingSource {
            service: "-bad".to_string()
        }));
    }

    #[test]
    fn test_duplicate_service_and_volume() {
        let violations = violations_of(
            "services:\n  db:\n    image: postgres\n  db:\n    image: mysql\nvolumes:\n  data:\n  data:\n",
        );
        assert!(violations.contains(&Violation::DuplicateService {
            name: "db".to_string()
        }));
        assert!(violations.contains(&Violation::DuplicateVolume {
            name: "data".to_string()
        }));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let violations = violations_of(
            r#"
services:
  app:
    build: .
    ports: ["8000:8000", "http"]
    depends_on: [ghost]
    volumes: ["cache:/cache"]
  worker:
    image: worker
    ports: ["8000:8000"]
  broken:
    image: "worker:"
"#,
        );
        assert_eq!(violations.len(), 5, "{:?}", violations);
    }

    #[test]
    fn test_bind_mounts_need_no_declaration() {
        let topology = Topology::parse(
            "services:\n  db:\n    image: postgres\n    volumes:\n      - ./init:/docker-entrypoint-initdb.d:ro\n      - /tmp/cache\n",
        )
        .unwrap();
        assert_eq!(topology.services()[0].volumes.len(), 2);
    }

    #[test]
    fn test_long_form_depends_on_conditions() {
        let topology = Topology::parse(
            r#"
services:
  app:
    build:
      context: .
      dockerfile: Dockerfile.prod
    depends_on:
      db:
        condition: service_healthy
  db:
    image: postgres
"#,
        )
        .unwrap();
        let app = topology.service("app").unwrap();
        assert_eq!(app.depends_on[0].condition, StartCondition::ServiceHealthy);

        let violations = violations_of(
            "services:\n  app:\n    build: .\n    depends_on:\n      db:\n        condition: ready\n  db:\n    image: postgres\n",
        );
        assert!(matches!(
            violations.as_slice(),
            [Violation::InvalidCondition { condition, .. }] if condition == "ready"
        ));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let topology = Topology::parse("services: {}\n").unwrap();
        assert!(topology.services().is_empty());
        assert!(topology.start_order().is_empty());
    }

    #[test]
    fn test_require_unknown_service() {
        let topology = Topology::parse(CANONICAL_TOPOLOGY).unwrap();
        assert!(matches!(
            topology.require_service("cache"),
            Err(TopologyError::UnknownService { .. })
        ));
    }
}
