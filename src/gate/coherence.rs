//! Coherence Gate (spec §4.4): a density proxy against the `coherence`
//! index, with hysteresis so the route doesn't thrash at the boundary.
//! Observational only. `GateDecision` is logged, never consulted by the
//! scoring algebra (spec §9 Open Questions).

use crate::embedding_index::EmbeddingIndex;

use super::types::{polylog, GateDecision, GateRoute};

/// `1 / mean(distances)`. Empty input is density-zero; an all-zero distance
/// vector is maximally dense, represented as the largest finite `f64`.
pub fn estimate_lambda(distances: &[f32]) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }
    let mean: f64 = distances.iter().map(|d| *d as f64).sum::<f64>() / distances.len() as f64;
    if mean <= 0.0 {
        return f64::MAX;
    }
    1.0 / mean
}

/// Owns the hysteresis state for one logical session (spec §5: one actor
/// per session, no cross-session sharing).
pub struct CoherenceGate {
    previous_route: GateRoute,
}

impl CoherenceGate {
    pub fn new() -> Self {
        Self {
            previous_route: GateRoute::L3Gate,
        }
    }

    /// Computes λ against `index` for `query_vector`'s k=5 nearest neighbors
    /// and decides the route. Fail-open: a search error or missing index
    /// yields λ=0 and stays on the previous route.
    pub fn decide_from_index(
        &mut self,
        index: Option<&EmbeddingIndex>,
        query_vector: Option<&[f32]>,
    ) -> GateDecision {
        let (lambda, db_size) = match (index, query_vector) {
            (Some(index), Some(vector)) if !index.is_empty() => {
                let hits = index.search(&vector.to_vec(), 5).unwrap_or_default();
                let distances: Vec<f32> = hits.iter().map(|h| h.cosine_distance).collect();
                (estimate_lambda(&distances), index.len())
            }
            (Some(index), _) => (0.0, index.len()),
            (None, _) => (0.0, 0),
        };
        self.decide(lambda, db_size)
    }

    pub fn decide(&mut self, lambda: f64, db_size: usize) -> GateDecision {
        let threshold = polylog(db_size);

        let route = match self.previous_route {
            GateRoute::L3Gate if lambda >= threshold * 1.1 => GateRoute::MinCutGate,
            GateRoute::MinCutGate if lambda < threshold * 0.9 => GateRoute::L3Gate,
            other => other,
        };

        let reason = format!(
            "lambda={lambda:.4} threshold={threshold:.4} db_size={db_size} previous={:?} -> {:?}",
            self.previous_route, route
        );
        self.previous_route = route;

        GateDecision {
            route,
            lambda,
            threshold,
            db_size,
            reason,
        }
    }
}

impl Default for CoherenceGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_distances_give_zero_lambda() {
        assert_eq!(estimate_lambda(&[]), 0.0);
    }

    #[test]
    fn all_zero_distances_give_max_lambda() {
        assert_eq!(estimate_lambda(&[0.0, 0.0]), f64::MAX);
    }

    #[test]
    fn hysteresis_holds_l3_gate_below_upper_band() {
        let mut gate = CoherenceGate::new();
        let threshold = polylog(10);
        let decision = gate.decide(threshold * 1.05, 10);
        assert_eq!(decision.route, GateRoute::L3Gate);
    }

    #[test]
    fn hysteresis_enters_mincut_above_upper_band() {
        let mut gate = CoherenceGate::new();
        let threshold = polylog(10);
        let decision = gate.decide(threshold * 1.2, 10);
        assert_eq!(decision.route, GateRoute::MinCutGate);
    }

    #[test]
    fn hysteresis_holds_mincut_gate_above_lower_band() {
        let mut gate = CoherenceGate::new();
        let threshold = polylog(10);
        gate.decide(threshold * 1.2, 10);
        let decision = gate.decide(threshold * 0.95, 10);
        assert_eq!(decision.route, GateRoute::MinCutGate);
    }

    #[test]
    fn hysteresis_leaves_mincut_below_lower_band() {
        let mut gate = CoherenceGate::new();
        let threshold = polylog(10);
        gate.decide(threshold * 1.2, 10);
        let decision = gate.decide(threshold * 0.8, 10);
        assert_eq!(decision.route, GateRoute::L3Gate);
    }
}
