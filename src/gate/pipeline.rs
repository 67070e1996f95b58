//! Top-level four-stage admission pipeline (spec §4.3). Orchestrates
//! Normalizer output through Scan → Analyze → Coherence Gate → Safety → PII,
//! honoring each layer's fail-open/fail-closed policy.

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use crate::config::GateConfig;
use crate::embedder::{Embedder, ScannerSpace};
use crate::embedding_index::EmbeddingIndex;
use crate::mincut::ExactMinCutBackend;
use crate::normalizer::normalize;
use crate::resilience::CircuitBreaker;
use crate::transport::Transport;

use super::analyze::run_l2;
use super::coherence::CoherenceGate;
use super::pii::run_l4;
use super::safety::run_l3;
use super::scan::run_l1;
use super::types::{DefenceResult, Verdict};

pub struct GatePipeline {
    config: GateConfig,
    transport: Arc<dyn Transport>,
    attack_index: Option<EmbeddingIndex>,
    coherence_index: Option<EmbeddingIndex>,
    embedder: Option<Arc<dyn Embedder<ScannerSpace>>>,
    pii_breaker: CircuitBreaker,
    coherence_gate: std::sync::Mutex<CoherenceGate>,
    exact_min_cut: Option<Arc<dyn ExactMinCutBackend>>,
}

impl GatePipeline {
    pub fn new(
        config: GateConfig,
        transport: Arc<dyn Transport>,
        attack_index: Option<EmbeddingIndex>,
        coherence_index: Option<EmbeddingIndex>,
        embedder: Option<Arc<dyn Embedder<ScannerSpace>>>,
    ) -> Self {
        let pii_breaker = CircuitBreaker::new(config.breaker);
        Self {
            config,
            transport,
            attack_index,
            coherence_index,
            embedder,
            pii_breaker,
            coherence_gate: std::sync::Mutex::new(CoherenceGate::new()),
            exact_min_cut: None,
        }
    }

    /// Wires in an external exact min-cut solver purely for observation.
    /// Its result is logged alongside the in-process star-λ, never
    /// consulted when deciding a verdict (spec §9).
    pub fn with_exact_min_cut(mut self, backend: Arc<dyn ExactMinCutBackend>) -> Self {
        self.exact_min_cut = Some(backend);
        self
    }

    pub async fn process(&self, text: &str) -> DefenceResult {
        let start = Instant::now();
        let mut verdicts = Vec::with_capacity(4);

        let (l1_verdict, l1_result) = run_l1(text);
        verdicts.push(l1_verdict);

        let normalized = normalize(text);
        let (l2_verdict, l2_result) = run_l2(
            text,
            &normalized,
            self.attack_index.as_ref(),
            self.embedder.as_deref(),
        )
        .await;
        let l2_score = l2_verdict.score;
        verdicts.push(l2_verdict);

        {
            let mut gate = self.coherence_gate.lock().unwrap();
            let query_vector = if let Some(embedder) = &self.embedder {
                embedder.embed(&normalized).await.ok()
            } else {
                None
            };
            let decision = gate.decide_from_index(self.coherence_index.as_ref(), query_vector.as_deref());
            let exact_cut = self.exact_min_cut(self.coherence_index.as_ref(), query_vector.as_deref());
            tracing::debug!(
                route = ?decision.route,
                lambda = decision.lambda,
                threshold = decision.threshold,
                exact_min_cut = ?exact_cut,
                "coherence gate decision"
            );
        }

        let prior_score = l1_result.score.max(l2_score);
        let (l3_verdict, l3_result) = run_l3(text, prior_score, self.transport.as_ref(), &self.config.thresholds).await;
        let l3_failed = !l3_verdict.passed;
        verdicts.push(l3_verdict);

        if let Verdict::Blocked = l3_result.verdict {
            let total_latency = start.elapsed();
            self.warn_on_budget(total_latency);
            let reason = l3_result.block_reason.unwrap_or_else(|| "blocked".to_string());
            self.fire_l5_learn(text, &normalized, Verdict::Blocked, &reason);
            return DefenceResult::blocked(reason, verdicts, total_latency);
        }
        debug_assert!(!l3_failed, "fail-closed layer must short-circuit before this point");

        let (l4_verdict, l4_result) = run_l4(
            text,
            self.transport.as_ref(),
            &self.pii_breaker,
            &self.config.retry,
            self.config.features.fail_open_detection,
        )
        .await;
        let l4_blocked = l4_result.blocked;
        verdicts.push(l4_verdict);

        let total_latency = start.elapsed();
        self.warn_on_budget(total_latency);

        if l4_blocked {
            self.fire_l5_learn(text, &normalized, Verdict::Blocked, "PII layer failed closed");
            return DefenceResult::blocked("PII layer failed closed", verdicts, total_latency);
        }

        if let Verdict::Flagged = l3_result.verdict {
            self.fire_l5_learn(text, &normalized, Verdict::Flagged, "flagged by L3 safety score");
        }

        DefenceResult::admitted(l3_result.verdict, l4_result.redacted_text, verdicts, total_latency)
    }

    /// Fires the adaptive learner asynchronously (spec §6:
    /// `features.enable_learning -> fire L5 (learn) asynchronously`). Never
    /// awaited: pattern insertion into the attack-patterns index (spec §5)
    /// must not add latency to the admission decision it learns from, and a
    /// learn failure never affects the already-returned verdict.
    fn fire_l5_learn(&self, raw_text: &str, normalized_text: &str, verdict: Verdict, reason: &str) {
        if !self.config.features.enable_learning {
            return;
        }
        let payload = serde_json::json!({
            "rawText": raw_text,
            "normalizedText": normalized_text,
            "verdict": verdict,
            "reason": reason,
        });
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.call(crate::transport::Tool::Learn, payload).await {
                warn!(error = %e, "L5 learn dispatch failed");
            }
        });
    }

    /// Runs the wired-in exact solver over the same k=5 neighborhood the
    /// coherence gate searches, for comparison against the in-process
    /// star-λ. Returns `None` whenever no backend is wired, no index is
    /// present, or the index has fewer than 2 entries to form an edge.
    fn exact_min_cut(&self, index: Option<&EmbeddingIndex>, query_vector: Option<&[f32]>) -> Option<f64> {
        let backend = self.exact_min_cut.as_ref()?;
        let index = index?;
        let vector = query_vector?;
        if index.is_empty() {
            return None;
        }
        let hits = index.search(&vector.to_vec(), 5).ok()?;
        if hits.is_empty() {
            return None;
        }
        let leaf_weights: Vec<f64> = hits.iter().map(|h| h.cosine_distance as f64).collect();
        let graph = crate::mincut::DenseGraph::star(&leaf_weights);
        Some(backend.min_cut(&graph))
    }

    fn warn_on_budget(&self, total_latency: std::time::Duration) {
        let budget = std::time::Duration::from_millis(self.config.timeouts.fast_path_ms);
        if total_latency > budget {
            warn!(
                total_latency_ms = total_latency.as_millis() as u64,
                budget_ms = self.config.timeouts.fast_path_ms,
                "fast-path budget exceeded"
            );
        }
    }
}
