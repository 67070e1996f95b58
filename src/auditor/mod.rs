//! Out-of-band semantic auditor (spec §4.5). Runs concurrently with, not
//! inside, the Gate Pipeline; uses the *semantic* embedder rather than the
//! scanner's char-code proxy (spec §9: the two spaces are independently
//! calibrated and never unified).

mod threat_state;

pub use threat_state::ThreatState;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CoherenceConfig;
use crate::embedder::{cosine_distance, Embedder, SemanticSpace};
use crate::embedding_index::EmbeddingIndex;
use crate::gate::coherence::estimate_lambda;
use crate::mincut::{stoer_wagner, DenseGraph};

const K_NEIGHBORS: usize = 5;

pub struct AsyncAuditor {
    config: CoherenceConfig,
    embedder: Arc<dyn Embedder<SemanticSpace>>,
    coherence_index: Option<EmbeddingIndex>,
    attack_index: Option<EmbeddingIndex>,
    clean_index: Option<EmbeddingIndex>,
    threat_state: Arc<ThreatState>,
}

impl AsyncAuditor {
    pub fn new(
        config: CoherenceConfig,
        embedder: Arc<dyn Embedder<SemanticSpace>>,
        coherence_index: Option<EmbeddingIndex>,
        attack_index: Option<EmbeddingIndex>,
        clean_index: Option<EmbeddingIndex>,
        threat_state: Arc<ThreatState>,
    ) -> Self {
        Self {
            config,
            embedder,
            coherence_index,
            attack_index,
            clean_index,
            threat_state,
        }
    }

    /// Fires the audit as a detached task. Never awaited by the caller;
    /// the auditor may complete after the request it concerns has returned.
    pub fn spawn_audit(self: Arc<Self>, request_id: String, text: String) {
        tokio::spawn(async move {
            self.audit(&request_id, &text).await;
        });
    }

    pub async fn audit(&self, request_id: &str, text: &str) {
        let vector = match self.embedder.embed(text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(request_id, error = %e, "async auditor: embedding unavailable, abstaining");
                return;
            }
        };

        let lambda = self.lambda_average(&vector);
        let star_lambda = self.star_lambda(&vector);
        let ratio = self.partition_ratio(&vector);

        let mut votes = 0;
        let n = if ratio.is_some() { 3 } else { 2 };

        if let Some(r) = ratio {
            if r > self.config.partition_ratio_threshold {
                votes += 1;
            }
        }
        if lambda >= self.config.semantic_lambda_threshold {
            votes += 1;
        }
        if star_lambda >= self.config.star_mincut_threshold {
            votes += 1;
        }

        let required = (n as f64 / 2.0).ceil() as usize;
        if votes >= required {
            self.threat_state.escalate(format!(
                "consensus escalation on request {request_id}: {votes}/{n} votes (lambda={lambda:.3}, star_lambda={star_lambda:.3}, ratio={ratio:?})"
            ));
        } else if votes > 0 {
            info!(request_id, votes, n, lambda, star_lambda, ?ratio, "smoke detected, no escalation");
        }
    }

    fn neighbor_distances(index: &EmbeddingIndex, vector: &[f32]) -> Vec<f32> {
        index
            .search(&vector.to_vec(), K_NEIGHBORS)
            .map(|hits| hits.into_iter().map(|h| h.cosine_distance).collect())
            .unwrap_or_default()
    }

    fn lambda_average(&self, vector: &[f32]) -> f64 {
        match &self.coherence_index {
            Some(index) if !index.is_empty() => estimate_lambda(&Self::neighbor_distances(index, vector)),
            _ => 0.0,
        }
    }

    fn star_lambda(&self, vector: &[f32]) -> f64 {
        let distances = match &self.coherence_index {
            Some(index) if !index.is_empty() => Self::neighbor_distances(index, vector),
            _ => return 0.0,
        };
        if distances.is_empty() {
            return 0.0;
        }
        let leaf_weights: Vec<f64> = distances.iter().map(|d| (1.0 - *d as f64).max(0.0)).collect();
        stoer_wagner(&DenseGraph::star(&leaf_weights))
    }

    fn partition_ratio(&self, vector: &[f32]) -> Option<f64> {
        let clean = self.clean_index.as_ref().filter(|i| !i.is_empty())?;
        let attack = self.attack_index.as_ref().filter(|i| !i.is_empty())?;

        let d_clean = mean_distance(clean, vector)?;
        let d_attack = mean_distance(attack, vector)?;
        if d_attack < 1e-9 {
            return None;
        }
        Some(d_clean / d_attack)
    }
}

fn mean_distance(index: &EmbeddingIndex, vector: &[f32]) -> Option<f64> {
    let distances = AsyncAuditor::neighbor_distances(index, vector);
    if distances.is_empty() {
        return None;
    }
    Some(distances.iter().map(|d| *d as f64).sum::<f64>() / distances.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HnswConfig;
    use crate::embedding_index::PatternEntry;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedEmbedder(Vec<f32>);
    #[async_trait]
    impl Embedder<SemanticSpace> for FixedEmbedder {
        fn dim(&self) -> usize {
            self.0.len()
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    fn index_with(vectors: &[(&str, Vec<f32>)]) -> EmbeddingIndex {
        let mut index = EmbeddingIndex::open_in_memory(2, HnswConfig::default()).unwrap();
        for (id, v) in vectors {
            index
                .insert(&PatternEntry {
                    id: id.to_string(),
                    vector: v.clone(),
                    metadata: json!({}),
                })
                .unwrap();
        }
        index
    }

    #[tokio::test]
    async fn strong_consensus_escalates() {
        let coherence = index_with(&[("a", vec![1.0, 0.0]), ("b", vec![0.99, 0.01])]);
        let threat_state = Arc::new(ThreatState::new());
        let auditor = AsyncAuditor::new(
            CoherenceConfig {
                partition_ratio_threshold: 1.0,
                semantic_lambda_threshold: 0.5,
                star_mincut_threshold: 0.1,
            },
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Some(coherence),
            None,
            None,
            Arc::clone(&threat_state),
        );

        auditor.audit("req-1", "malicious text").await;
        assert!(threat_state.is_escalated());
    }

    #[tokio::test]
    async fn no_index_abstains_without_escalating() {
        let threat_state = Arc::new(ThreatState::new());
        let auditor = AsyncAuditor::new(
            CoherenceConfig::default(),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            None,
            None,
            None,
            Arc::clone(&threat_state),
        );
        auditor.audit("req-2", "benign text").await;
        assert!(!threat_state.is_escalated());
    }

    #[tokio::test]
    async fn missing_clean_index_skips_partition_ratio_vote() {
        let coherence = index_with(&[("a", vec![0.0, 1.0])]);
        let threat_state = Arc::new(ThreatState::new());
        let auditor = AsyncAuditor::new(
            CoherenceConfig::default(),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Some(coherence),
            None,
            None,
            Arc::clone(&threat_state),
        );
        auditor.audit("req-3", "unrelated").await;
        // Only 2 of 2 discriminants available; a lone weak signal should not escalate.
        assert!(!threat_state.is_escalated());
    }
}
