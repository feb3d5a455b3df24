//! Service domain types
//!
//! Validated, immutable building blocks of a topology. Every parser here
//! takes the raw document text and returns a reason string on failure; the
//! topology loader turns that into a [`Violation`](crate::error::Violation).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Image reference such as `postgres:15` or `ghcr.io/org/app@sha256:...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Repository including any registry host (e.g., "postgres", "localhost:5000/app")
    pub name: String,
    /// Explicit tag, if one was given
    pub tag: Option<String>,
    /// Content digest, if one was given
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse `name[:tag][@digest]`
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() || reference.chars().any(char::is_whitespace) {
            return None;
        }

        let (rest, digest) = match reference.split_once('@') {
            Some((rest, digest)) if !digest.is_empty() => (rest, Some(digest.to_string())),
            Some(_) => return None,
            None => (reference, None),
        };

        // A colon after the last slash separates the tag; earlier colons belong
        // to a registry host:port.
        let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match rest[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                let tag = &rest[split + 1..];
                if tag.is_empty() {
                    return None;
                }
                (&rest[..split], Some(tag.to_string()))
            }
            None => (rest, None),
        };

        if name.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            tag,
            digest,
        })
    }

    /// Tag the runtime will pull; `latest` when none was given
    pub fn effective_tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("latest")
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl Serialize for ImageReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where a service image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSource {
    /// Built from a local context; `image` names the result when also declared
    Build {
        context: String,
        dockerfile: Option<String>,
        image: Option<ImageReference>,
    },
    /// Pulled as a pre-built image
    Image(ImageReference),
}

// Serialized as `build: {...}` or `image: name:tag`.
impl Serialize for ServiceSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct BuildView<'a> {
            context: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            dockerfile: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            image: Option<&'a ImageReference>,
        }

        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Build {
                context,
                dockerfile,
                image,
            } => map.serialize_entry(
                "build",
                &BuildView {
                    context,
                    dockerfile: dockerfile.as_deref(),
                    image: image.as_ref(),
                },
            )?,
            Self::Image(image) => map.serialize_entry("image", image)?,
        }
        map.end()
    }
}

/// Transport protocol of a published port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            "sctp" => Some(Self::Sctp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        }
    }
}

/// `[host_ip:][external:]internal[/protocol]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    /// Host-side port; `None` means the port is only reachable on the private network
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<u16>,
    pub internal: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    pub fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err("empty port mapping".to_string());
        }

        let (ports, protocol) = match spec.rsplit_once('/') {
            Some((ports, proto)) => (
                ports,
                Protocol::from_str(proto).ok_or_else(|| format!("unknown protocol '{}'", proto))?,
            ),
            None => (spec, Protocol::Tcp),
        };

        let (host_part, internal) = match ports.rsplit_once(':') {
            Some((host, internal)) => (Some(host), internal),
            None => (None, ports),
        };
        let internal = parse_port_number(internal)?;

        let (host_ip, external) = match host_part {
            None => (None, None),
            Some(host) => match host.rsplit_once(':') {
                Some((ip, external)) => {
                    if ip.is_empty() {
                        return Err("empty host ip".to_string());
                    }
                    let external = if external.is_empty() {
                        None
                    } else {
                        Some(parse_port_number(external)?)
                    };
                    (Some(ip.to_string()), external)
                }
                None => (None, Some(parse_port_number(host)?)),
            },
        };

        Ok(Self {
            host_ip,
            external,
            internal,
            protocol,
        })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = &self.host_ip {
            write!(f, "{}:", ip)?;
        }
        match (self.external, &self.host_ip) {
            (Some(external), _) => write!(f, "{}:", external)?,
            (None, Some(_)) => write!(f, ":")?,
            (None, None) => {}
        }
        write!(f, "{}", self.internal)?;
        if self.protocol != Protocol::Tcp {
            write!(f, "/{}", self.protocol.as_str())?;
        }
        Ok(())
    }
}

fn parse_port_number(s: &str) -> Result<u16, String> {
    if s.contains('-') {
        return Err(format!("port ranges are not supported ('{}')", s));
    }
    match s.parse::<u16>() {
        Ok(0) => Err("port 0 is not allowed".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!("'{}' is not a port number between 1 and 65535", s)),
    }
}

/// What a mount binds into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSource {
    /// A volume declared under top-level `volumes:`
    Named(String),
    /// A host path
    Bind(String),
    /// Runtime-created, unnamed volume
    Anonymous,
}

/// `source:/target[:ro|rw]` or `/target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: MountSource,
    pub target: String,
    pub read_only: bool,
}

// Long-form mount syntax: `{type: volume, source: pgdata, target: /data}`
impl Serialize for VolumeMount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (kind, source) = match &self.source {
            MountSource::Named(name) => ("volume", Some(name.as_str())),
            MountSource::Bind(path) => ("bind", Some(path.as_str())),
            MountSource::Anonymous => ("volume", None),
        };

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", kind)?;
        if let Some(source) = source {
            map.serialize_entry("source", source)?;
        }
        map.serialize_entry("target", &self.target)?;
        if self.read_only {
            map.serialize_entry("read_only", &true)?;
        }
        map.end()
    }
}

impl VolumeMount {
    pub fn parse(spec: &str) -> Result<Self, String> {
        let parts: Vec<&str> = spec.trim().split(':').collect();
        let (source, target, mode) = match parts.as_slice() {
            [target] => (None, *target, None),
            [source, target] => (Some(*source), *target, None),
            [source, target, mode] => (Some(*source), *target, Some(*mode)),
            _ => return Err("expected 'source:/path[:mode]'".to_string()),
        };

        if !target.starts_with('/') {
            return Err(format!("mount path '{}' must be absolute", target));
        }

        let read_only = match mode {
            None | Some("rw") => false,
            Some("ro") => true,
            Some(other) => return Err(format!("unknown mount mode '{}'", other)),
        };

        let source = match source {
            None => MountSource::Anonymous,
            Some("") => return Err("empty mount source".to_string()),
            Some(s) if s.starts_with('/') || s.starts_with('.') || s.starts_with('~') => {
                MountSource::Bind(s.to_string())
            }
            Some(s) => MountSource::Named(s.to_string()),
        };

        Ok(Self {
            source,
            target: target.to_string(),
            read_only,
        })
    }

    /// Name of the declared volume this mount refers to, if any
    pub fn volume_name(&self) -> Option<&str> {
        match &self.source {
            MountSource::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// When a dependent may start relative to its dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartCondition {
    /// Dependency start has been initiated; says nothing about readiness
    #[default]
    ServiceStarted,
    /// Dependency reports healthy
    ServiceHealthy,
    /// Dependency ran to completion with exit code 0
    ServiceCompletedSuccessfully,
}

impl StartCondition {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "service_started" => Some(Self::ServiceStarted),
            "service_healthy" => Some(Self::ServiceHealthy),
            "service_completed_successfully" => Some(Self::ServiceCompletedSuccessfully),
            _ => None,
        }
    }

    /// Whether the dependent waits for more than a started process
    pub fn gates_readiness(&self) -> bool {
        !matches!(self, Self::ServiceStarted)
    }
}

/// A start-order edge from the owning service to `service`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub service: String,
    pub condition: StartCondition,
}

/// A single declared environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Validated service definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    /// Service name (e.g., "app", "db")
    pub name: String,
    /// Build context or image
    pub source: ServiceSource,
    /// Environment in declaration order, names unique
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Dependency>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeMount>,
}

impl ServiceDefinition {
    /// Look up a declared environment value
    pub fn env(&self, name: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|var| var.name == name)
            .map(|var| var.value.as_str())
    }

    /// Image the service runs, whether pulled or tagged from a build
    pub fn image(&self) -> Option<&ImageReference> {
        match &self.source {
            ServiceSource::Image(image) => Some(image),
            ServiceSource::Build { image, .. } => image.as_ref(),
        }
    }

    /// Whether this service publishes `internal` inside the private network
    pub fn exposes_internal_port(&self, internal: u16) -> bool {
        self.ports.iter().any(|p| p.internal == internal)
    }

    /// First port reachable from the host over TCP
    pub fn first_published_tcp_port(&self) -> Option<u16> {
        self.ports
            .iter()
            .filter(|p| p.protocol == Protocol::Tcp)
            .find_map(|p| p.external)
    }

    pub fn depends_on(&self, service: &str) -> Option<&Dependency> {
        self.depends_on.iter().find(|d| d.service == service)
    }
}
