//! Content fingerprints for chunk ids and response cache keys.
//!
//! Both digests are blake3 hex. The response key hashes a canonical JSON
//! structure of the question plus the sorted, deduplicated chunk-id set, so
//! the fingerprint does not depend on retrieval order.

use serde::Serialize;

use crate::types::{ChunkId, QueryFingerprint};

/// Field order is part of the on-disk key format; do not reorder.
#[derive(Serialize)]
struct ResponseKey<'a> {
    q: &'a str,
    ctx: Vec<&'a str>,
}

/// Stable content id for a chunk: blake3 of the trimmed text.
///
/// Re-ingesting identical text maps to the same id, so chunk ingestion is
/// idempotent by construction.
#[must_use]
pub fn chunk_id(text: &str) -> ChunkId {
    blake3::hash(text.trim().as_bytes()).to_hex().to_string()
}

/// Cache key for a `(question, retrieved chunk set)` pair.
///
/// Two calls with the same question and the same *set* of ids yield the same
/// fingerprint regardless of the order the ids were retrieved in; any change
/// to the question text or to the set changes it.
#[must_use]
pub fn response_fingerprint(question: &str, chunk_ids: &[ChunkId]) -> QueryFingerprint {
    let mut ctx: Vec<&str> = chunk_ids.iter().map(String::as_str).collect();
    ctx.sort_unstable();
    ctx.dedup();
    let key = ResponseKey { q: question, ctx };
    // Serializing a string + string list cannot fail.
    let material = serde_json::to_string(&key).unwrap_or_default();
    blake3::hash(material.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_retrieval_order() {
        let a = response_fingerprint("q", &["c1".into(), "c2".into(), "c3".into()]);
        let b = response_fingerprint("q", &["c3".into(), "c1".into(), "c2".into()]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_ignores_duplicate_ids() {
        let a = response_fingerprint("q", &["c1".into(), "c2".into()]);
        let b = response_fingerprint("q", &["c2".into(), "c1".into(), "c1".into()]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_is_sensitive_to_question_and_set() {
        let base = response_fingerprint("q", &["c1".into(), "c2".into()]);
        assert_ne!(base, response_fingerprint("q?", &["c1".into(), "c2".into()]));
        assert_ne!(base, response_fingerprint("q", &["c1".into()]));
        assert_ne!(base, response_fingerprint("q", &["c1".into(), "c9".into()]));
    }

    #[test]
    fn chunk_id_is_stable_across_surrounding_whitespace() {
        assert_eq!(chunk_id("hello"), chunk_id("  hello\n"));
        assert_ne!(chunk_id("hello"), chunk_id("hello!"));
    }
}
