//! HTTP inference engine speaking the OpenAI chat-completions protocol.

use std::sync::Arc;
use std::time::Duration;

use askdb_core::config::Config;
use askdb_core::traits::InferenceEngine;
use askdb_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

const SYSTEM_PROMPT: &str =
    "Answer the question using only the provided context. If the context does not \
     contain the answer, say so.";

#[derive(Debug, Clone)]
pub struct HttpInferenceConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

pub struct HttpInferenceEngine {
    client: reqwest::Client,
    config: HttpInferenceConfig,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl HttpInferenceEngine {
    pub fn new(config: HttpInferenceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("inference HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl InferenceEngine for HttpInferenceEngine {
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("Context:\n{context}\n\nQuestion: {question}")},
            ],
        });

        let mut req = self.client.post(&self.config.api_url).json(&payload);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::Inference(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Inference(format!("API error: {}", response.status())));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("malformed response: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Inference("response contained no choices".to_string()))
    }
}

/// Builds the inference engine described by the loaded configuration.
/// `inference.api_url` is required; there is no offline fallback for answer
/// generation.
pub fn get_default_engine(config: &Config) -> anyhow::Result<Arc<dyn InferenceEngine>> {
    let api_url: String = config.get("inference.api_url")?;
    let engine = HttpInferenceEngine::new(HttpInferenceConfig {
        api_url,
        api_key: config.get("inference.api_key").ok(),
        model: config.get_or("inference.model", "gpt-4o-mini".to_string()),
        timeout: Duration::from_secs(config.get_or("inference.timeout_secs", DEFAULT_TIMEOUT_SECS)),
    })?;
    Ok(Arc::new(engine))
}
