use askdb_core::Error;
use askdb_store::CacheStore;
use tempfile::TempDir;

#[test]
fn chunk_round_trip() {
    let tmp = TempDir::new().expect("tempdir");
    let store = CacheStore::open(tmp.path()).expect("open");

    store.put_chunk("c1", "Paris is the capital of France.").expect("put");
    assert_eq!(
        store.get_chunk("c1").as_deref(),
        Some("Paris is the capital of France.")
    );
    assert_eq!(store.get_chunk("missing"), None);
}

#[test]
fn namespaces_survive_reopen() {
    let tmp = TempDir::new().expect("tempdir");
    {
        let store = CacheStore::open(tmp.path()).expect("open");
        store.put_chunk("c1", "alpha").expect("put chunk");
        store.put_response(&"fp1".to_string(), "answer one").expect("put response");
    }

    let reopened = CacheStore::open(tmp.path()).expect("reopen");
    assert_eq!(reopened.get_chunk("c1").as_deref(), Some("alpha"));
    assert_eq!(
        reopened.get_response(&"fp1".to_string()).as_deref(),
        Some("answer one")
    );
    assert_eq!(reopened.chunk_count(), 1);
    assert_eq!(reopened.response_count(), 1);
}

#[test]
fn put_chunk_is_idempotent_upsert() {
    let tmp = TempDir::new().expect("tempdir");
    let store = CacheStore::open(tmp.path()).expect("open");

    store.put_chunk("c1", "first").expect("put");
    store.put_chunk("c1", "first").expect("put again");
    assert_eq!(store.chunk_count(), 1);

    // An upsert with new text overwrites.
    store.put_chunk("c1", "second").expect("overwrite");
    assert_eq!(store.get_chunk("c1").as_deref(), Some("second"));
}

#[test]
fn empty_cached_answer_is_a_hit_not_a_miss() {
    let tmp = TempDir::new().expect("tempdir");
    let store = CacheStore::open(tmp.path()).expect("open");

    store.put_response(&"fp".to_string(), "").expect("put");
    assert_eq!(store.get_response(&"fp".to_string()).as_deref(), Some(""));
    assert_eq!(store.get_response(&"other".to_string()), None);
}

#[test]
fn corrupt_namespace_file_is_reported() {
    let tmp = TempDir::new().expect("tempdir");
    {
        let store = CacheStore::open(tmp.path()).expect("open");
        store.put_chunk("c1", "alpha").expect("put");
    }
    std::fs::write(tmp.path().join("chunks.json"), "{not json").expect("clobber");

    match CacheStore::open(tmp.path()).err() {
        Some(Error::StorageCorrupt { namespace, .. }) => assert_eq!(namespace, "chunks"),
        other => panic!("expected StorageCorrupt, got {other:?}"),
    }
}

#[test]
fn failed_persist_rolls_back_new_entry() {
    let tmp = TempDir::new().expect("tempdir");
    let store = CacheStore::open(tmp.path()).expect("open");
    store.put_response(&"fp1".to_string(), "first answer").expect("put");

    // A directory squatting on the temp-file path makes the rewrite fail.
    std::fs::create_dir(tmp.path().join("responses.json.tmp")).expect("block tmp path");

    match store.put_response(&"fp2".to_string(), "never durable").err() {
        Some(Error::StorageWrite { namespace, .. }) => assert_eq!(namespace, "responses"),
        other => panic!("expected StorageWrite, got {other:?}"),
    }

    // The failed insert is rolled back; the earlier entry is untouched.
    assert_eq!(store.response_count(), 1);
    assert_eq!(store.get_response(&"fp2".to_string()), None);
    assert_eq!(store.get_response(&"fp1".to_string()).as_deref(), Some("first answer"));
}

#[test]
fn failed_persist_restores_overwritten_value() {
    let tmp = TempDir::new().expect("tempdir");
    let store = CacheStore::open(tmp.path()).expect("open");
    store.put_chunk("c1", "original text").expect("put");

    std::fs::create_dir(tmp.path().join("chunks.json.tmp")).expect("block tmp path");

    store.put_chunk("c1", "replacement text").expect_err("write must fail");
    assert_eq!(store.get_chunk("c1").as_deref(), Some("original text"));
}

#[test]
fn chunks_snapshot_reflects_all_entries() {
    let tmp = TempDir::new().expect("tempdir");
    let store = CacheStore::open(tmp.path()).expect("open");
    store.put_chunk("b", "two").expect("put");
    store.put_chunk("a", "one").expect("put");

    let all = store.chunks();
    assert_eq!(all.len(), 2);
    // BTreeMap snapshot iterates in id order.
    let ids: Vec<&String> = all.keys().collect();
    assert_eq!(ids, ["a", "b"]);
}
