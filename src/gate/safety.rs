//! L3 Safety (spec §4.3): 5ms budget, **fail-closed**. Never routed through
//! the circuit breaker or retry: a single transport error is itself the
//! BLOCKED path (spec §4.8).

use std::time::Instant;

use serde::Deserialize;
use serde_json::json;

use crate::config::ThresholdsConfig;
use crate::transport::{Tool, Transport};

use super::types::{LayerVerdict, Verdict};

#[derive(Debug, Deserialize)]
struct SafeResponse {
    score: f64,
}

pub struct SafetyResult {
    pub verdict: Verdict,
    pub score: f64,
    pub block_reason: Option<String>,
}

fn classify(score: f64, thresholds: &ThresholdsConfig) -> Verdict {
    if score >= thresholds.block_score {
        Verdict::Blocked
    } else if score >= thresholds.flag_score {
        Verdict::Flagged
    } else {
        Verdict::Safe
    }
}

/// Runs L3. `prior_score` is `max(L1.score, L2.score)`; the transport's own
/// assessment is combined via `max` before thresholding, so an upstream
/// layer's high confidence cannot be diluted by a lenient L3 response.
pub async fn run_l3(
    raw: &str,
    prior_score: f64,
    transport: &dyn Transport,
    thresholds: &ThresholdsConfig,
) -> (LayerVerdict, SafetyResult) {
    let start = Instant::now();

    let call = transport.call(Tool::Safe, json!({ "text": raw, "prior_score": prior_score }));
    match call.await {
        Ok(value) => match serde_json::from_value::<SafeResponse>(value) {
            Ok(response) => {
                let score = prior_score.max(response.score);
                let verdict = classify(score, thresholds);
                let block_reason = matches!(verdict, Verdict::Blocked)
                    .then(|| "blocked by safety thresholds".to_string());
                let layer_verdict = LayerVerdict::pass(
                    "L3_Safety",
                    score,
                    start.elapsed(),
                    format!("{verdict:?}"),
                );
                (
                    layer_verdict,
                    SafetyResult {
                        verdict,
                        score,
                        block_reason,
                    },
                )
            }
            Err(e) => fail_closed(start, e.to_string()),
        },
        Err(e) => fail_closed(start, e.to_string()),
    }
}

fn fail_closed(start: Instant, error: impl Into<String>) -> (LayerVerdict, SafetyResult) {
    let error = error.into();
    let layer_verdict = LayerVerdict {
        layer: "L3_Safety".to_string(),
        passed: false,
        score: 1.0,
        latency: start.elapsed(),
        details: "Safety gate internal error".to_string(),
        error: Some(error),
    };
    (
        layer_verdict,
        SafetyResult {
            verdict: Verdict::Blocked,
            score: 1.0,
            block_reason: Some("Safety gate internal error".to_string()),
        },
    )
}
