//! In-memory nearest-neighbor index over the chunk store.

use std::cmp::Ordering;
use std::sync::Arc;

use askdb_core::traits::Embedder;
use askdb_core::types::ChunkId;
use askdb_core::Result;
use askdb_store::CacheStore;

/// Derived, rebuildable view of the chunk store: one embedding per chunk
/// known at build time.
///
/// The index does not watch the store. Chunks written after `build` are
/// invisible until the caller builds a fresh index; that staleness window is
/// documented behavior, not an inconsistency.
pub struct ChunkIndex {
    embedder: Arc<dyn Embedder>,
    // Kept in ascending id order so stable sorts fall back to id order on
    // score ties.
    embeddings: Vec<(ChunkId, Vec<f32>)>,
}

impl ChunkIndex {
    /// Embeds every chunk currently in the store. O(chunks) embedding work;
    /// calling it again is the explicit rebuild operation.
    pub async fn build(store: &CacheStore, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunks = store.chunks();
        let ids: Vec<ChunkId> = chunks.keys().cloned().collect();
        let texts: Vec<String> = chunks.into_values().collect();
        let vectors = embedder.embed_batch(&texts).await?;
        tracing::debug!(chunks = ids.len(), "chunk index built");
        Ok(Self {
            embedder,
            embeddings: ids.into_iter().zip(vectors).collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Top-`k` chunk ids for `question`, most similar first.
    pub async fn rank(&self, question: &str, k: usize) -> Result<Vec<ChunkId>> {
        let q_vec = self.embedder.embed(question).await?;
        Ok(self.rank_embedded(&q_vec, k))
    }

    /// Rank against an already-embedded question, for callers that reuse the
    /// question vector (the context assembler embeds once for both chunk and
    /// visual ranking).
    ///
    /// Exact score ties break on ascending chunk id so repeated calls return
    /// the same ordered list, keeping downstream fingerprints reproducible.
    #[must_use]
    pub fn rank_embedded(&self, q_vec: &[f32], k: usize) -> Vec<ChunkId> {
        let mut scores: Vec<(&ChunkId, f32)> = self
            .embeddings
            .iter()
            .map(|(id, vec)| (id, cosine_similarity(q_vec, vec)))
            .collect();
        scores.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        scores.into_iter().take(k).map(|(id, _)| id.clone()).collect()
    }
}

/// Cosine of the angle between two vectors; zero-length inputs score 0.0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::cosine_similarity;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
