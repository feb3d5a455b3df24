//! Services layer - checks that go beyond the static topology
//!
//! Coordinates domain logic with the outside world: cross-service contract
//! checks and the opt-in network readiness probe.

pub mod connectivity;
pub mod readiness;

// Re-export commonly used types
pub use connectivity::Severity;
pub use readiness::ProbeConfig;
