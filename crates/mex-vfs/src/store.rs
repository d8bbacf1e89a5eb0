//! Workspace-local overlay store.
//!
//! ```text
//! <descriptor-stem>.overlay/
//!   index.json          path -> stored blob or tombstone, sorted
//!   blobs/<sha256>      content-addressed file data
//! ```
//!
//! The index holds no timestamps, so saving the same overlay twice writes
//! byte-identical files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, VfsError};

pub const STORE_INDEX_VERSION: u32 = 1;
const INDEX_FILE: &str = "index.json";
const BLOB_DIR: &str = "blobs";

/// One persisted overlay entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StoredEntry {
    Stored { sha256: String, size: u64 },
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreIndex {
    pub version: u32,
    pub entries: BTreeMap<String, StoredEntry>,
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self {
            version: STORE_INDEX_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// Hex SHA-256 of a byte buffer.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Handle to an overlay store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStore {
    root: PathBuf,
}

impl OverlayStore {
    /// Whether `root` looks like a store (has an index).
    #[must_use]
    pub fn exists(root: &Path) -> bool {
        root.join(INDEX_FILE).is_file()
    }

    /// Creates an empty store at `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let blobs = root.join(BLOB_DIR);
        fs::create_dir_all(&blobs).map_err(|e| VfsError::io("create directory", &blobs, e))?;
        let store = Self {
            root: root.to_path_buf(),
        };
        store.write_index(&StoreIndex::default())?;
        debug!(root = %root.display(), "created overlay store");
        Ok(store)
    }

    /// Opens an existing store. A directory without an index is corrupt.
    pub fn open(root: &Path) -> Result<Self> {
        if !Self::exists(root) {
            return Err(VfsError::CorruptStore {
                path: root.to_path_buf(),
                reason: "index.json is missing".to_string(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn blob_path(&self, sha256: &str) -> PathBuf {
        self.root.join(BLOB_DIR).join(sha256)
    }

    pub fn read_index(&self) -> Result<StoreIndex> {
        let path = self.index_path();
        let text = fs::read_to_string(&path).map_err(|e| VfsError::io("read", &path, e))?;
        let index: StoreIndex =
            serde_json::from_str(&text).map_err(|e| VfsError::CorruptStore {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if index.version > STORE_INDEX_VERSION {
            return Err(VfsError::CorruptStore {
                path,
                reason: format!("unsupported index version {}", index.version),
            });
        }
        Ok(index)
    }

    /// Replaces the index atomically.
    pub fn write_index(&self, index: &StoreIndex) -> Result<()> {
        let path = self.index_path();
        let mut text = serde_json::to_string_pretty(index).map_err(|e| VfsError::CorruptStore {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        text.push('\n');
        write_atomic(&path, text.as_bytes())
    }

    /// Stores a blob and returns its hash. Existing blobs are not rewritten.
    pub fn write_blob(&self, bytes: &[u8]) -> Result<String> {
        let sha256 = sha256_hex(bytes);
        let path = self.blob_path(&sha256);
        if !path.is_file() {
            write_atomic(&path, bytes)?;
        }
        Ok(sha256)
    }

    pub fn read_blob(&self, sha256: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(sha256);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VfsError::CorruptStore {
                path: path.clone(),
                reason: "blob referenced by the index is missing".to_string(),
            },
            _ => VfsError::io("read", &path, e),
        })?;
        Ok(bytes)
    }

    pub fn open_blob(&self, sha256: &str) -> Result<File> {
        let path = self.blob_path(sha256);
        File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VfsError::CorruptStore {
                path: path.clone(),
                reason: "blob referenced by the index is missing".to_string(),
            },
            _ => VfsError::io("open", &path, e),
        })
    }

    /// Deletes every blob not in `keep`. Returns how many were removed.
    pub fn prune(&self, keep: &BTreeSet<&str>) -> Result<usize> {
        let dir = self.root.join(BLOB_DIR);
        let listing = fs::read_dir(&dir).map_err(|e| VfsError::io("read directory", &dir, e))?;
        let mut removed = 0;
        for entry in listing {
            let entry = entry.map_err(|e| VfsError::io("read directory", &dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !keep.contains(name.as_ref()) {
                let path = entry.path();
                fs::remove_file(&path).map_err(|e| VfsError::io("delete", &path, e))?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "pruned overlay blobs");
        }
        Ok(removed)
    }
}

/// Writes `bytes` to a temp file next to `path`, syncs, then renames.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    let mut file = File::create(&temp_path).map_err(|e| VfsError::io("create", &temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| VfsError::io("write", &temp_path, e))?;
    file.sync_all()
        .map_err(|e| VfsError::io("sync", &temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| VfsError::io("rename", path, e))?;
    Ok(())
}
