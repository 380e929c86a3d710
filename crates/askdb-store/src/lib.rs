//! Durable key-value store backing the retrieval pipeline.
//!
//! Two independent namespaces live side by side in one directory:
//! `chunks.json` (chunk id -> text) and `responses.json` (query fingerprint
//! -> answer). Every write rewrites the whole namespace file; at the data
//! volumes this store targets that is an acceptable trade against the
//! simplicity of the format. Larger corpora should swap this type for an
//! appendable or indexed engine behind the same methods.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use askdb_core::types::{ChunkId, QueryFingerprint};
use askdb_core::{Error, Result};

const CHUNKS_FILE: &str = "chunks.json";
const RESPONSES_FILE: &str = "responses.json";

/// One on-disk namespace: an in-memory map mirrored by a JSON file.
///
/// The mutex gives the namespace single-writer discipline; without it two
/// concurrent writers could interleave their whole-file rewrites.
struct Namespace {
    name: &'static str,
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl Namespace {
    fn load(name: &'static str, path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| Error::StorageCorrupt {
                namespace: name,
                path: path.clone(),
                reason: e.to_string(),
            })?;
            serde_json::from_str(&raw).map_err(|e| Error::StorageCorrupt {
                namespace: name,
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            name,
            path,
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock();
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(source) = persist(&self.path, &entries) {
            // Roll back so the in-memory view never claims an entry that
            // was not made durable.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(Error::StorageWrite {
                namespace: self.name,
                path: self.path.clone(),
                source,
            });
        }
        tracing::debug!(namespace = self.name, key, "persisted entry");
        Ok(())
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Whole-namespace rewrite via temp file + rename, so a crash mid-write
/// leaves the previous snapshot intact rather than a truncated file.
fn persist(path: &Path, entries: &BTreeMap<String, String>) -> io::Result<()> {
    let data = serde_json::to_vec_pretty(entries)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &data)?;
    fs::rename(&tmp, path)
}

/// Persistent cache store holding the chunk and response namespaces.
///
/// This is the single source of truth for both; everything else in the
/// pipeline (notably the chunk index) is a rebuildable derived view.
pub struct CacheStore {
    chunks: Namespace,
    responses: Namespace,
}

impl CacheStore {
    /// Opens (or creates) the store rooted at `dir`, loading both
    /// namespaces. An unreadable or malformed namespace file is reported as
    /// [`Error::StorageCorrupt`] rather than silently replaced.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| Error::StorageWrite {
            namespace: "store",
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            chunks: Namespace::load("chunks", dir.join(CHUNKS_FILE))?,
            responses: Namespace::load("responses", dir.join(RESPONSES_FILE))?,
        })
    }

    /// Idempotent upsert of a chunk. Fails only if the durable write fails,
    /// in which case the in-memory view is left unchanged.
    pub fn put_chunk(&self, id: &str, text: &str) -> Result<()> {
        self.chunks.put(id, text)
    }

    /// Absence is not an error; chunks may legitimately not exist.
    pub fn get_chunk(&self, id: &str) -> Option<String> {
        self.chunks.get(id)
    }

    /// Snapshot of the full chunk namespace, used at index construction.
    pub fn chunks(&self) -> BTreeMap<ChunkId, String> {
        self.chunks.snapshot()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn put_response(&self, fingerprint: &QueryFingerprint, answer: &str) -> Result<()> {
        self.responses.put(fingerprint, answer)
    }

    /// `None` means "never computed"; a present-but-empty answer is a
    /// legitimate hit and is returned as `Some("")`.
    pub fn get_response(&self, fingerprint: &QueryFingerprint) -> Option<String> {
        self.responses.get(fingerprint)
    }

    pub fn response_count(&self) -> usize {
        self.responses.len()
    }
}
