//! L4 PII (spec §4.3): 5ms budget, fail-open by default, configurable to
//! fail-closed via `features.fail_open_detection = false`. Redacts detected
//! entities with `[REDACTED:<KIND>]` tokens; original text is never
//! retained on the SAFE path.

use std::time::Instant;

use serde::Deserialize;
use serde_json::json;

use crate::resilience::{call_with_breaker, CircuitBreaker};
use crate::config::RetryConfig;
use crate::transport::{Tool, Transport};

use super::types::LayerVerdict;

#[derive(Debug, Deserialize)]
struct PiiResponse {
    redacted_text: String,
    entities: Vec<String>,
}

pub struct PiiResult {
    pub redacted_text: String,
    pub entities: Vec<String>,
    /// Set only when the transport failed and `fail_open_detection = false`.
    pub blocked: bool,
}

/// Runs L4. On transport failure, `fail_open` decides whether the original
/// text passes through untouched (true) or the layer reports a block (false).
pub async fn run_l4(
    raw: &str,
    transport: &dyn Transport,
    breaker: &CircuitBreaker,
    retry: &RetryConfig,
    fail_open: bool,
) -> (LayerVerdict, PiiResult) {
    let start = Instant::now();

    let call_result = call_with_breaker(breaker, retry, || async {
        let value = transport.call(Tool::Pii, json!({ "text": raw })).await?;
        serde_json::from_value::<PiiResponse>(value).map_err(|e| {
            crate::error::Error::MalformedResponse(format!("invalid PII response: {e}"))
        })
    })
    .await;

    match call_result {
        Ok(response) => {
            let verdict = LayerVerdict::pass(
                "L4_Pii",
                0.0,
                start.elapsed(),
                format!("{} entit{} redacted", response.entities.len(), if response.entities.len() == 1 { "y" } else { "ies" }),
            );
            (
                verdict,
                PiiResult {
                    redacted_text: response.redacted_text,
                    entities: response.entities,
                    blocked: false,
                },
            )
        }
        Err(e) if fail_open => (
            LayerVerdict::fail_open("L4_Pii", start.elapsed(), e.to_string()),
            PiiResult {
                redacted_text: raw.to_string(),
                entities: Vec::new(),
                blocked: false,
            },
        ),
        Err(e) => {
            let verdict = LayerVerdict {
                layer: "L4_Pii".to_string(),
                passed: false,
                score: 1.0,
                latency: start.elapsed(),
                details: "PII layer failed closed".to_string(),
                error: Some(e.to_string()),
            };
            (
                verdict,
                PiiResult {
                    redacted_text: String::new(),
                    entities: Vec::new(),
                    blocked: true,
                },
            )
        }
    }
}
