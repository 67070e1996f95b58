//! Centralized error type for the admission core.
//!
//! Every fallible operation in this crate returns `Result<T>`. Layer-local
//! failures (fail-open layers, index unavailability, audit writes) are
//! caught and logged at their call site rather than propagated; see
//! `gate::pipeline` and `orchestrator` for where that happens.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// L3 Safety call failed. Always maps to a BLOCKED verdict.
    #[error("Safety gate internal error: {0}")]
    SafetyGate(String),

    /// Transport failure on a fail-open layer.
    #[error("transport transient error: {0}")]
    TransportTransient(String),

    /// Circuit breaker is OPEN; call was rejected without attempting transport.
    #[error("circuit breaker open")]
    BreakerOpen,

    /// Index file missing, unopenable, or manifest hash mismatch.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// Ledger/audit/witness write failed. Never affects verdict or delivery.
    #[error("audit write failed: {0}")]
    AuditWrite(String),

    /// A handoff was blocked by the gate pipeline.
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// A layer or the pipeline exceeded its latency budget. Logged, never
    /// returned from the pipeline itself, kept as a variant for callers
    /// that want to surface budget breaches through the same error type.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    /// The async auditor's `ThreatState` escalated; surfaced at the next
    /// phase boundary as a pipeline abort.
    #[error("consensus escalation: {0}")]
    ConsensusEscalation(String),

    /// Index reopened with HNSW parameters that differ from its frozen manifest.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed transport response (missing expected field).
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Internal(format!("database error: {err}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Configuration(err.to_string())
    }
}
