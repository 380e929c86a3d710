use askdb_core::traits::Embedder;
use askdb_core::Error;
use askdb_embed::HashEmbedder;

#[tokio::test]
async fn hash_embedder_shape_and_determinism() {
    let embedder = HashEmbedder::new(384).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[tokio::test]
async fn hash_embedder_overlap_beats_disjoint_vocabulary() {
    let embedder = HashEmbedder::new(384).expect("embedder");
    let q = embedder.embed("the capital of France").await.expect("embed");
    let close = embedder
        .embed("Paris is the capital of France.")
        .await
        .expect("embed");
    let far = embedder
        .embed("quantum entanglement experiments")
        .await
        .expect("embed");

    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&q, &close) > dot(&q, &far));
}

#[tokio::test]
async fn hash_embedder_normalizes_case_and_punctuation() {
    let embedder = HashEmbedder::new(384).expect("embedder");
    let a = embedder.embed("Paris, France!").await.expect("embed");
    let b = embedder.embed("paris france").await.expect("embed");
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() <= 1e-6);
    }
}

#[test]
fn zero_dimension_is_rejected_at_construction() {
    let err = HashEmbedder::new(0).expect_err("dim 0 must not construct");
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[tokio::test]
async fn empty_batch_is_empty() {
    let embedder = HashEmbedder::new(64).expect("embedder");
    let out = embedder.embed_batch(&[]).await.expect("embed_batch");
    assert!(out.is_empty());
}
