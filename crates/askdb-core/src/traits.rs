use async_trait::async_trait;

use crate::error::Result;

/// Text-to-vector embedding model, treated as an external collaborator.
///
/// Implementations must be deterministic for a fixed model version and return
/// vectors of length `dim()`.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Remote answer generator. May be slow (seconds) and may fail transiently;
/// callers decide what to do with failures, implementations just report them.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String>;
}
