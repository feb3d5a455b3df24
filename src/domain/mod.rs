//! Domain layer - pure topology logic
//!
//! This module contains the validated topology model with no external I/O
//! beyond reading the document. Types and functions here can be unit tested
//! without a container runtime.

pub mod environment;
pub mod sequencer;
pub mod service;
pub mod topology;
pub mod volume;

// Re-export commonly used types
pub use environment::ResolvedEnvironment;
pub use service::{ServiceDefinition, ServiceSource, StartCondition};
pub use topology::Topology;
