//! Shared types for the gate pipeline (spec §3 data model, §4.3, §4.4).

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Safe,
    Flagged,
    Blocked,
}

/// One layer's outcome. `score` is monotone in threat; the fail-closed
/// layer (L3) never sets `error`: an L3 failure is itself the BLOCKED path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerVerdict {
    pub layer: String,
    pub passed: bool,
    pub score: f64,
    pub latency: Duration,
    pub details: String,
    pub error: Option<String>,
}

impl LayerVerdict {
    pub fn pass(layer: &str, score: f64, latency: Duration, details: impl Into<String>) -> Self {
        Self {
            layer: layer.to_string(),
            passed: true,
            score,
            latency,
            details: details.into(),
            error: None,
        }
    }

    pub fn fail_open(layer: &str, latency: Duration, error: impl Into<String>) -> Self {
        Self {
            layer: layer.to_string(),
            passed: true,
            score: 0.0,
            latency,
            details: "fail-open on transport error".to_string(),
            error: Some(error.into()),
        }
    }
}

/// The pipeline's final answer for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenceResult {
    pub verdict: Verdict,
    pub is_blocked: bool,
    pub safe_text: String,
    pub total_latency: Duration,
    pub verdicts: Vec<LayerVerdict>,
    pub block_reason: Option<String>,
}

impl DefenceResult {
    pub fn blocked(reason: impl Into<String>, verdicts: Vec<LayerVerdict>, total_latency: Duration) -> Self {
        Self {
            verdict: Verdict::Blocked,
            is_blocked: true,
            safe_text: String::new(),
            total_latency,
            verdicts,
            block_reason: Some(reason.into()),
        }
    }

    pub fn admitted(
        verdict: Verdict,
        safe_text: String,
        verdicts: Vec<LayerVerdict>,
        total_latency: Duration,
    ) -> Self {
        debug_assert!(!matches!(verdict, Verdict::Blocked));
        Self {
            verdict,
            is_blocked: false,
            safe_text,
            total_latency,
            verdicts,
            block_reason: None,
        }
    }
}

/// L2's classification (spec §4.3 scoring algebra).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Attack,
    Suspicious,
    Informational,
}

/// Coherence gate route (spec §4.4). Observational only, never mutates a
/// layer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateRoute {
    L3Gate,
    MinCutGate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    pub route: GateRoute,
    pub lambda: f64,
    pub threshold: f64,
    pub db_size: usize,
    pub reason: String,
}

/// `(log2(max(n,2)))^2`, the router's density threshold (spec §4.4, §8).
pub fn polylog(n: usize) -> f64 {
    if n <= 1 {
        return 1.0;
    }
    let log2 = (n as f64).log2();
    log2 * log2
}
