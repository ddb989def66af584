//! File-based result store: one JSON file per cache key.
//!
//! Entries are created on miss and read on hit; nothing is ever invalidated
//! automatically. Writes are plain (no locking, no temp-file rename), so two
//! processes racing on the same key end with last-writer-wins.

use crate::error::RuntimeResult;
use crate::values::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ResultStore {
    base_dir: PathBuf,
}

impl ResultStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    /// An unusable path is a fatal configuration problem and fails here.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> RuntimeResult<Self> {
        let dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { base_dir: dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The file a key maps to: the key string verbatim, no sharding.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    pub fn load(&self, key: &str) -> RuntimeResult<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content)?;
        Ok(Some(value))
    }

    /// Persist a result under `key`, returning the file written.
    pub fn save(&self, key: &str, value: &Value) -> RuntimeResult<PathBuf> {
        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}
