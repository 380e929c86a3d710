//! `Embedder` implementations.
//!
//! `HttpEmbedder` talks to an OpenAI-style `/embeddings` endpoint and is the
//! production path. `HashEmbedder` derives token-hash feature vectors with no
//! model at all; it is deterministic and cheap, which makes it the default
//! for tests and offline runs.

use std::sync::Arc;
use std::time::Duration;

use askdb_core::config::Config;
use askdb_core::traits::Embedder;
use askdb_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_DIM: usize = 384;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`HttpEmbedder`].
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dim: usize,
    pub timeout: Duration,
}

/// Client for a remote embedding model speaking the OpenAI embeddings
/// protocol: `POST {api_url} {"input": [...], "model": "..."}`.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: HttpEmbedderConfig,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("embedding HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let payload = serde_json::json!({
            "input": inputs,
            "model": self.config.model,
        });

        let mut req = self.client.post(&self.config.api_url).json(&payload);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::EmbeddingUnavailable(format!(
                "API error: {}",
                response.status()
            )));
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("malformed response: {e}")))?;
        if body.data.len() != inputs.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                body.data.len()
            )));
        }

        let mut vectors = Vec::with_capacity(body.data.len());
        for row in body.data {
            if row.embedding.len() != self.config.dim {
                return Err(Error::EmbeddingUnavailable(format!(
                    "expected dimension {}, got {}",
                    self.config.dim,
                    row.embedding.len()
                )));
            }
            vectors.push(row.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize {
        self.config.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}

/// Model-free embedder hashing normalized tokens into a fixed-size feature
/// vector, L2-normalized so cosine similarity behaves.
///
/// Overlapping vocabulary yields higher similarity, which is enough for
/// retrieval tests and offline smoke runs.
#[derive(Debug)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    /// Fails with [`Error::InvalidConfig`] when `dim` is zero; the bucket
    /// index is `hash % dim`.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig(
                "embedding dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self { dim })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token: String = token
                .to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect();
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += (((h >> 32) as u32) as f32) / (u32::MAX as f32) + 0.5;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}

/// Builds the embedder described by the loaded configuration.
///
/// `APP_USE_HASH_EMBEDDINGS=1` (or a missing `embedding.api_url`) selects the
/// hash embedder so the pipeline stays usable without a model endpoint.
pub fn get_default_embedder(config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    let dim: usize = config.get_or("embedding.dim", DEFAULT_DIM);

    let use_hash = std::env::var("APP_USE_HASH_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let api_url: Option<String> = config.get("embedding.api_url").ok();

    match (use_hash, api_url) {
        (false, Some(api_url)) => {
            let embedder = HttpEmbedder::new(HttpEmbedderConfig {
                api_url,
                api_key: config.get("embedding.api_key").ok(),
                model: config.get_or("embedding.model", "text-embedding-3-small".to_string()),
                dim,
                timeout: Duration::from_secs(
                    config.get_or("embedding.timeout_secs", DEFAULT_TIMEOUT_SECS),
                ),
            })?;
            Ok(Arc::new(embedder))
        }
        _ => {
            tracing::info!(dim, "using hash embedder");
            Ok(Arc::new(HashEmbedder::new(dim)?))
        }
    }
}
