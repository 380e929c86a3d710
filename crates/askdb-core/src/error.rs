use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to persist '{namespace}' namespace to {path}: {source}")]
    StorageWrite {
        namespace: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Namespace '{namespace}' at {path} is corrupt: {reason}")]
    StorageCorrupt {
        namespace: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("Embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Inference engine call failed: {0}")]
    Inference(String),

    #[error("Chunk '{chunk_id}' is indexed but missing from the store")]
    DataIntegrity { chunk_id: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
