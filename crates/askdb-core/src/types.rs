//! Domain types shared by the store, retrieval, and pipeline crates.

use serde::{Deserialize, Serialize};

/// Content-derived identifier of a chunk (blake3 hex of normalized text).
pub type ChunkId = String;

/// Hex digest keying the response cache; see [`crate::fingerprint`].
pub type QueryFingerprint = String;

/// Where an answer came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Cache,
    Live,
}

/// One record of the visual description source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualFrame {
    pub description: String,
}

/// Uniform per-question output of a batch run.
///
/// Exactly one of `answer` and `error` is populated. Failed questions are
/// kept in the output rather than dropped, so a batch run always produces
/// one record per input question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<AnswerSource>,
    pub chunk_ids: Vec<ChunkId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRecord {
    pub fn answered(
        question: impl Into<String>,
        answer: impl Into<String>,
        source: AnswerSource,
        chunk_ids: Vec<ChunkId>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: Some(answer.into()),
            source: Some(source),
            chunk_ids,
            error: None,
        }
    }

    pub fn failed(question: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: None,
            source: None,
            chunk_ids: Vec::new(),
            error: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
