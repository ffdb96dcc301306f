//! Key/value persistence for serialized documents.
//!
//! Stores only move opaque blobs around. Reads degrade to `None` on a missing
//! or unreadable key and writes log their failures instead of returning them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

/// Flat key/value storage for document blobs
pub trait DocumentStore {
    /// The blob stored under `key`, or `None` when absent or unreadable
    fn load(&self, key: &str) -> Option<String>;

    /// Store `blob` under `key`. Failures are logged, not returned.
    fn save(&mut self, key: &str, blob: &str);
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters that could escape the directory are replaced.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    /// Keys with a stored document, sorted
    pub fn keys(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        keys.sort();
        keys
    }
}

impl DocumentStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("No document stored at {:?}", path);
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(blob) => {
                info!("Loaded document from {:?}", path);
                Some(blob)
            }
            Err(e) => {
                warn!("Failed to read document {:?}: {}", path, e);
                None
            }
        }
    }

    fn save(&mut self, key: &str, blob: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            error!("Failed to create documents directory {:?}: {}", self.dir, e);
            return;
        }
        let path = self.path_for(key);
        if let Err(e) = std::fs::write(&path, blob) {
            error!("Failed to save document {:?}: {}", path, e);
        } else {
            info!("Document saved to {:?}", path);
        }
    }
}

/// In-memory store, for tests and embedding without a filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, blob: &str) {
        self.entries.insert(key.to_string(), blob.to_string());
    }
}
