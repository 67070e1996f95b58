//! The embedding model itself is out of scope (spec §1); this crate only
//! consumes one. `Embedder` is the capability the core calls, generalized
//! from the teacher's `LocalEmbeddings` stub into a trait so both the
//! fast-path scanner's char-code proxy and the async auditor's true-semantic
//! model can implement it without unifying their vector spaces (spec §9
//! Open Questions: the two λ spaces differ by roughly 50x and must stay
//! independently calibrated).

use async_trait::async_trait;

use crate::error::Result;

pub type Embedding = Vec<f32>;

/// Marker distinguishing the fast-path scanner's embedding space from the
/// auditor's. An `Embedder<Space = Scanner>` and one with
/// `Space = Semantic` are never accidentally compared.
pub trait EmbeddingSpace: Send + Sync + 'static {}

pub struct ScannerSpace;
impl EmbeddingSpace for ScannerSpace {}

pub struct SemanticSpace;
impl EmbeddingSpace for SemanticSpace {}

#[async_trait]
pub trait Embedder<Space: EmbeddingSpace>: Send + Sync {
    /// Returns this embedder's fixed output dimension.
    fn dim(&self) -> usize;

    /// Embeds `text` into a unit vector (`‖v‖₂ ≈ 1`) of length [`Embedder::dim`].
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// L2-normalizes `v` in place; no-op on the zero vector.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine distance in `[0, 2]`. Assumes both vectors are unit length, in
/// which case `1 - dot` is exact; falls back to the full formula otherwise.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "embeddings must share a dimension");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 1.0;
    }
    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}
