//! Assembles the textual context handed to the inference engine.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use askdb_core::traits::Embedder;
use askdb_core::types::{ChunkId, VisualFrame};
use askdb_core::{Error, Result};
use askdb_store::CacheStore;

use crate::index::{cosine_similarity, ChunkIndex};

const CHUNK_SEPARATOR: &str = "\n---\n";
const VISUAL_HEADER: &str = "\n\n[Visual Descriptions]\n";

const DEFAULT_TOP_K: usize = 3;
const DEFAULT_VISUAL_TOP_K: usize = 2;

/// Context text plus the chunk ids it was assembled from.
///
/// `chunk_ids` deliberately excludes visual material: visual descriptions
/// augment the text sent to the engine but never participate in response
/// fingerprinting.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    pub chunk_ids: Vec<ChunkId>,
}

pub struct ContextAssembler {
    store: Arc<CacheStore>,
    index: Arc<ChunkIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    visual_top_k: usize,
}

impl ContextAssembler {
    pub fn new(store: Arc<CacheStore>, index: Arc<ChunkIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            index,
            embedder,
            top_k: DEFAULT_TOP_K,
            visual_top_k: DEFAULT_VISUAL_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_visual_top_k(mut self, visual_top_k: usize) -> Self {
        self.visual_top_k = visual_top_k;
        self
    }

    /// Retrieves the top-k chunks for `question`, concatenates their text in
    /// ranking order, and optionally appends the most relevant visual
    /// descriptions from `visual_source`.
    ///
    /// A missing or malformed visual source is skipped with a warning; a
    /// chunk id the index returned but the store cannot resolve is
    /// [`Error::DataIntegrity`], since it signals index/store divergence.
    pub async fn build_context(
        &self,
        question: &str,
        visual_source: Option<&Path>,
    ) -> Result<AssembledContext> {
        let q_vec = self.embedder.embed(question).await?;
        let chunk_ids = self.index.rank_embedded(&q_vec, self.top_k);

        let mut parts = Vec::with_capacity(chunk_ids.len());
        for id in &chunk_ids {
            let chunk = self
                .store
                .get_chunk(id)
                .ok_or_else(|| Error::DataIntegrity { chunk_id: id.clone() })?;
            parts.push(chunk);
        }
        let mut text = parts.join(CHUNK_SEPARATOR);

        if let Some(path) = visual_source {
            let visuals = self.relevant_visuals(&q_vec, path).await?;
            if !visuals.is_empty() {
                text.push_str(VISUAL_HEADER);
                text.push_str(&visuals.join("\n"));
            }
        }

        Ok(AssembledContext { text, chunk_ids })
    }

    /// Top visual descriptions by similarity to the question, most similar
    /// first. Unreadable or malformed sources degrade to an empty list;
    /// embedding failures still propagate.
    async fn relevant_visuals(&self, q_vec: &[f32], path: &Path) -> Result<Vec<String>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "visual source unreadable, skipping");
                return Ok(Vec::new());
            }
        };
        let frames: Vec<VisualFrame> = match serde_json::from_str(&raw) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "visual source malformed, skipping");
                return Ok(Vec::new());
            }
        };
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let descriptions: Vec<String> = frames.into_iter().map(|f| f.description).collect();
        let vectors = self.embedder.embed_batch(&descriptions).await?;
        let mut scored: Vec<(String, f32)> = descriptions
            .into_iter()
            .zip(vectors)
            .map(|(description, vec)| {
                let sim = cosine_similarity(q_vec, &vec);
                (description, sim)
            })
            .collect();
        // Stable sort: ties keep source-file order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(self.visual_top_k)
            .map(|(description, _)| description)
            .collect())
    }
}
