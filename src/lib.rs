//! Request-admission security core for an LLM-facing agent runtime.
//!
//! A request passes through [`normalizer::normalize`] and the
//! [`gate::GatePipeline`] synchronously; concurrently, the [`auditor`]
//! module runs an independent semantic audit against a shared
//! [`auditor::ThreatState`]. The [`orchestrator`] ties both together for
//! inter-agent handoffs, recording a hash-linked provenance trail via
//! [`orchestrator::WitnessLog`].

pub mod auditor;
pub mod chunker;
pub mod config;
pub mod embedder;
pub mod embedding_index;
pub mod error;
pub mod gate;
pub mod mincut;
pub mod orchestrator;
pub mod resilience;
pub mod transport;

mod normalizer;

pub use error::{Error, Result};
pub use normalizer::normalize;

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// The library version as a semantic version string.
pub fn version() -> String {
    format!("{VERSION_MAJOR}.{VERSION_MINOR}.{VERSION_PATCH}")
}
