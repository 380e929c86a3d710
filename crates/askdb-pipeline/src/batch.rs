//! Drives the retrieval + caching pipeline over a list of questions.

use std::path::PathBuf;
use std::sync::Arc;

use askdb_core::traits::InferenceEngine;
use askdb_core::types::{ChunkId, ResultRecord};
use askdb_core::Result;
use askdb_retrieval::ContextAssembler;
use tokio::sync::Semaphore;

use crate::gate::{Resolved, ResponseGate};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 1 means strictly sequential processing in input order.
    pub concurrency: usize,
    /// Visual description source passed to every context build.
    pub visual_source: Option<PathBuf>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            visual_source: None,
        }
    }
}

/// Sequences context assembly and the response gate per question.
///
/// One question failing does not abort the batch; the failure is recorded in
/// that question's [`ResultRecord`] and processing continues. Output order
/// always matches input order, regardless of concurrency.
pub struct BatchRunner {
    assembler: Arc<ContextAssembler>,
    gate: Arc<ResponseGate>,
    engine: Arc<dyn InferenceEngine>,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(
        assembler: Arc<ContextAssembler>,
        gate: Arc<ResponseGate>,
        engine: Arc<dyn InferenceEngine>,
    ) -> Self {
        Self {
            assembler,
            gate,
            engine,
            options: BatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(&self, questions: &[String]) -> Vec<ResultRecord> {
        self.run_with_progress(questions, |_| {}).await
    }

    /// Like [`BatchRunner::run`], invoking `on_done` once per finished
    /// question (in completion order, which under concurrency may differ
    /// from input order).
    pub async fn run_with_progress<F>(&self, questions: &[String], on_done: F) -> Vec<ResultRecord>
    where
        F: Fn(&ResultRecord) + Send + Sync,
    {
        if self.options.concurrency <= 1 {
            let mut records = Vec::with_capacity(questions.len());
            for question in questions {
                let record = self.process(question).await;
                on_done(&record);
                records.push(record);
            }
            return records;
        }

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let on_done = &on_done;
        let tasks = questions.iter().map(|question| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire().await.ok();
                let record = self.process(question).await;
                on_done(&record);
                record
            }
        });
        futures::future::join_all(tasks).await
    }

    async fn process(&self, question: &str) -> ResultRecord {
        match self.answer(question).await {
            Ok((resolved, chunk_ids)) => {
                ResultRecord::answered(question, resolved.answer, resolved.source, chunk_ids)
            }
            Err(e) => {
                tracing::warn!(question, error = %e, "question failed");
                ResultRecord::failed(question, e.to_string())
            }
        }
    }

    /// Context is fully assembled before the gate is consulted; the cache
    /// write (inside the gate) happens before the record is produced.
    async fn answer(&self, question: &str) -> Result<(Resolved, Vec<ChunkId>)> {
        let ctx = self
            .assembler
            .build_context(question, self.options.visual_source.as_deref())
            .await?;
        let resolved = self
            .gate
            .resolve(question, &ctx.chunk_ids, &ctx.text, self.engine.as_ref())
            .await?;
        Ok((resolved, ctx.chunk_ids))
    }
}
