//! Response caching and batch orchestration on top of retrieval.

pub mod batch;
pub mod gate;
pub mod infer;

pub use batch::{BatchOptions, BatchRunner};
pub use gate::{Resolved, ResponseGate};
pub use infer::{get_default_engine, HttpInferenceConfig, HttpInferenceEngine};
