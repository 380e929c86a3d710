//! At-most-one inference call per distinct (question, retrieved-chunk-set).

use std::collections::HashMap;
use std::sync::Arc;

use askdb_core::fingerprint::response_fingerprint;
use askdb_core::traits::InferenceEngine;
use askdb_core::types::{AnswerSource, ChunkId, QueryFingerprint};
use askdb_core::Result;
use askdb_store::CacheStore;
use tokio::sync::Mutex;

/// Outcome of a gate resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub answer: String,
    pub source: AnswerSource,
    pub fingerprint: QueryFingerprint,
}

/// Checks the response namespace before invoking the inference engine and
/// populates it after a successful call.
///
/// The check-then-act sequence is guarded by a per-fingerprint lock
/// (single-flight): concurrent callers with the same fingerprint serialize,
/// so late arrivals observe the first caller's cached answer instead of
/// re-invoking the engine.
pub struct ResponseGate {
    store: Arc<CacheStore>,
    inflight: Mutex<HashMap<QueryFingerprint, Arc<Mutex<()>>>>,
}

impl ResponseGate {
    #[must_use]
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached answer for the fingerprint of `(question,
    /// chunk_ids)`, or calls `engine` once and caches the result.
    ///
    /// Engine failures propagate without writing any cache entry. A failed
    /// cache *write* is logged and the freshly computed answer is still
    /// returned; callers must not assume every live answer was made durable.
    pub async fn resolve(
        &self,
        question: &str,
        chunk_ids: &[ChunkId],
        context: &str,
        engine: &dyn InferenceEngine,
    ) -> Result<Resolved> {
        let fingerprint = response_fingerprint(question, chunk_ids);

        let slot = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(fingerprint.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let outcome = {
            let _guard = slot.lock().await;
            self.resolve_locked(question, context, &fingerprint, engine)
                .await
        };

        // Retire the slot once nobody else holds it; a waiter that cloned
        // the entry keeps it alive until it finishes.
        let mut inflight = self.inflight.lock().await;
        if inflight
            .get(&fingerprint)
            .is_some_and(|entry| Arc::strong_count(entry) <= 2)
        {
            inflight.remove(&fingerprint);
        }

        outcome
    }

    async fn resolve_locked(
        &self,
        question: &str,
        context: &str,
        fingerprint: &QueryFingerprint,
        engine: &dyn InferenceEngine,
    ) -> Result<Resolved> {
        if let Some(answer) = self.store.get_response(fingerprint) {
            tracing::debug!(fingerprint = %fingerprint, "response cache hit");
            return Ok(Resolved {
                answer,
                source: AnswerSource::Cache,
                fingerprint: fingerprint.clone(),
            });
        }

        let answer = engine.answer(question, context).await?;
        if let Err(e) = self.store.put_response(fingerprint, &answer) {
            tracing::warn!(fingerprint = %fingerprint, error = %e, "answer computed but not cached");
        }
        Ok(Resolved {
            answer,
            source: AnswerSource::Live,
            fingerprint: fingerprint.clone(),
        })
    }
}
