//! Named volume definitions

use serde::Serialize;

/// A named persistent volume.
///
/// Content is owned by the runtime; the topology only declares that it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
}
