//! Nearest-neighbor chunk selection and context assembly.

pub mod context;
pub mod index;

pub use context::{AssembledContext, ContextAssembler};
pub use index::{cosine_similarity, ChunkIndex};
