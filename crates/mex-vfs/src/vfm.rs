//! The virtual file manager.
//!
//! Every read checks the overlay first and falls through to the source
//! image. Writes never touch the source image: they land in memory as
//! pending entries and reach the overlay store on [`VirtualFileManager::save`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, VfsError};
use crate::image::SourceImage;
use crate::path::{normalize, split_name};
use crate::store::{OverlayStore, StoreIndex, StoredEntry};

/// State of one overlay path.
#[derive(Debug, Clone)]
enum OverlayEntry {
    /// Persisted in the overlay store.
    Stored { sha256: String, size: u64 },
    /// Set since the last save.
    Pending(Arc<[u8]>),
    /// Tombstone hiding a source image file.
    Removed,
}

impl OverlayEntry {
    fn is_data(&self) -> bool {
        !matches!(self, Self::Removed)
    }
}

fn not_found(path: &str) -> VfsError {
    VfsError::NotFound {
        path: path.to_string(),
    }
}

/// Overlay lookup shared by the live manager and its snapshots.
struct Lookup<'a> {
    source: &'a dyn SourceImage,
    store: &'a OverlayStore,
    entries: &'a BTreeMap<String, OverlayEntry>,
}

impl Lookup<'_> {
    fn exists(&self, path: &str) -> bool {
        let Ok(path) = normalize(path) else {
            return false;
        };
        match self.entries.get(&path) {
            Some(entry) => entry.is_data(),
            None => self.source.contains(&path),
        }
    }

    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path)?;
        match self.entries.get(&path) {
            Some(OverlayEntry::Pending(bytes)) => Ok(bytes.to_vec()),
            Some(OverlayEntry::Stored { sha256, .. }) => self.store.read_blob(sha256),
            Some(OverlayEntry::Removed) => Err(not_found(&path)),
            None if self.source.contains(&path) => self.source.read_file(&path),
            None => Err(not_found(&path)),
        }
    }

    fn get_stream(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let path = normalize(path)?;
        match self.entries.get(&path) {
            Some(OverlayEntry::Pending(bytes)) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
            Some(OverlayEntry::Stored { sha256, .. }) => Ok(Box::new(self.store.open_blob(sha256)?)),
            Some(OverlayEntry::Removed) => Err(not_found(&path)),
            None if self.source.contains(&path) => self.source.open_file(&path),
            None => Err(not_found(&path)),
        }
    }

    fn files(&self) -> Vec<String> {
        let mut merged: BTreeSet<String> = self
            .source
            .list_files()
            .into_iter()
            .filter(|p| !matches!(self.entries.get(p), Some(OverlayEntry::Removed)))
            .collect();
        merged.extend(
            self.entries
                .iter()
                .filter(|(_, e)| e.is_data())
                .map(|(p, _)| p.clone()),
        );
        merged.into_iter().collect()
    }
}

/// Copy-on-write file overlay over a read-only source image.
pub struct VirtualFileManager {
    source: Arc<dyn SourceImage>,
    store: OverlayStore,
    entries: BTreeMap<String, OverlayEntry>,
    dirty: bool,
}

impl std::fmt::Debug for VirtualFileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileManager")
            .field("store", &self.store)
            .field("entries", &self.entries.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl VirtualFileManager {
    /// Binds an empty overlay to `store`.
    pub fn new(source: Arc<dyn SourceImage>, store: OverlayStore) -> Self {
        Self {
            source,
            store,
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Loads the overlay persisted in `store`.
    pub fn open(source: Arc<dyn SourceImage>, store: OverlayStore) -> Result<Self> {
        let index = store.read_index()?;
        let entries = index
            .entries
            .into_iter()
            .map(|(path, entry)| {
                let entry = match entry {
                    StoredEntry::Stored { sha256, size } => OverlayEntry::Stored { sha256, size },
                    StoredEntry::Removed => OverlayEntry::Removed,
                };
                (path, entry)
            })
            .collect::<BTreeMap<_, _>>();
        debug!(root = %store.root().display(), entries = entries.len(), "opened overlay");
        Ok(Self {
            source,
            store,
            entries,
            dirty: false,
        })
    }

    fn lookup(&self) -> Lookup<'_> {
        Lookup {
            source: self.source.as_ref(),
            store: &self.store,
            entries: &self.entries,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn SourceImage> {
        &self.source
    }

    /// Rebinds the overlay to another source image.
    pub fn set_source(&mut self, source: Arc<dyn SourceImage>) {
        self.source = source;
    }

    #[must_use]
    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    /// Whether anything changed since the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.lookup().exists(path)
    }

    pub fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.lookup().get(path)
    }

    pub fn get_stream(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        self.lookup().get_stream(path)
    }

    /// Merged file listing: source files minus tombstones plus overlay data.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.lookup().files()
    }

    /// Paths that differ from the source image, including removals.
    #[must_use]
    pub fn modified_paths(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Stores `bytes` at `path`, replacing any previous overlay content.
    pub fn set(&mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let path = normalize(path)?;
        let bytes: Vec<u8> = bytes.into();
        debug!(path = %path, size = bytes.len(), "overlay set");
        self.entries
            .insert(path, OverlayEntry::Pending(Arc::from(bytes)));
        self.dirty = true;
        Ok(())
    }

    /// Hides `path`. Overlay-only files are dropped outright; source files
    /// get a tombstone.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let path = normalize(path)?;
        if !self.lookup().exists(&path) {
            return Err(not_found(&path));
        }
        if self.source.contains(&path) {
            self.entries.insert(path.clone(), OverlayEntry::Removed);
        } else {
            self.entries.remove(&path);
        }
        debug!(path = %path, "overlay remove");
        self.dirty = true;
        Ok(())
    }

    /// First free path derived from `base`: `base` itself, then
    /// `name_1.ext`, `name_2.ext` and so on.
    pub fn get_unique_file_path(&self, base: &str) -> Result<String> {
        let base = normalize(base)?;
        if !self.exists(&base) {
            return Ok(base);
        }
        let (dir, stem, ext) = split_name(&base);
        let mut n = 1usize;
        loop {
            let candidate = format!("{dir}{stem}_{n}{ext}");
            if !self.exists(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Flushes pending entries to the overlay store.
    ///
    /// Writes missing blobs, replaces the index atomically, then deletes
    /// blobs nothing references. Calling it again without changes rewrites
    /// identical bytes.
    pub fn save(&mut self) -> Result<()> {
        for entry in self.entries.values_mut() {
            if let OverlayEntry::Pending(bytes) = entry {
                let size = bytes.len() as u64;
                let sha256 = self.store.write_blob(bytes)?;
                *entry = OverlayEntry::Stored { sha256, size };
            }
        }
        self.store.write_index(&self.index())?;

        let keep: BTreeSet<&str> = self
            .entries
            .values()
            .filter_map(|e| match e {
                OverlayEntry::Stored { sha256, .. } => Some(sha256.as_str()),
                _ => None,
            })
            .collect();
        self.store.prune(&keep)?;

        self.dirty = false;
        info!(
            root = %self.store.root().display(),
            entries = self.entries.len(),
            "saved overlay"
        );
        Ok(())
    }

    /// Copies the live overlay into a new store at `root` and rebinds to it.
    pub fn save_to(&mut self, root: &Path) -> Result<()> {
        if root == self.store.root() {
            return self.save();
        }
        let target = OverlayStore::create(root)?;
        let mut moved = BTreeMap::new();
        for (path, entry) in &self.entries {
            let entry = match entry {
                OverlayEntry::Pending(bytes) => OverlayEntry::Stored {
                    sha256: target.write_blob(bytes)?,
                    size: bytes.len() as u64,
                },
                OverlayEntry::Stored { sha256, size } => {
                    let bytes = self.store.read_blob(sha256)?;
                    OverlayEntry::Stored {
                        sha256: target.write_blob(&bytes)?,
                        size: *size,
                    }
                }
                OverlayEntry::Removed => OverlayEntry::Removed,
            };
            moved.insert(path.clone(), entry);
        }
        self.entries = moved;
        self.store = target;
        self.store.write_index(&self.index())?;
        self.dirty = false;
        info!(root = %root.display(), "saved overlay to new location");
        Ok(())
    }

    fn index(&self) -> StoreIndex {
        let entries = self
            .entries
            .iter()
            .filter_map(|(path, entry)| {
                let stored = match entry {
                    OverlayEntry::Stored { sha256, size } => StoredEntry::Stored {
                        sha256: sha256.clone(),
                        size: *size,
                    },
                    OverlayEntry::Removed => StoredEntry::Removed,
                    OverlayEntry::Pending(_) => return None,
                };
                Some((path.clone(), stored))
            })
            .collect();
        StoreIndex {
            entries,
            ..StoreIndex::default()
        }
    }

    /// Read-only view of the current state, for a worker thread.
    #[must_use]
    pub fn snapshot(&self) -> VfsSnapshot {
        VfsSnapshot {
            source: Arc::clone(&self.source),
            store: self.store.clone(),
            entries: self.entries.clone(),
        }
    }
}

/// Frozen read-only copy of a [`VirtualFileManager`].
///
/// Pending data is shared, not copied. Stored entries keep reading from the
/// overlay store, so the owner must not save while a snapshot is in use.
#[derive(Clone)]
pub struct VfsSnapshot {
    source: Arc<dyn SourceImage>,
    store: OverlayStore,
    entries: BTreeMap<String, OverlayEntry>,
}

impl VfsSnapshot {
    fn lookup(&self) -> Lookup<'_> {
        Lookup {
            source: self.source.as_ref(),
            store: &self.store,
            entries: &self.entries,
        }
    }

    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.lookup().exists(path)
    }

    pub fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.lookup().get(path)
    }

    pub fn get_stream(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        self.lookup().get_stream(path)
    }

    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.lookup().files()
    }
}

impl std::fmt::Debug for VfsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VfsSnapshot")
            .field("store", &self.store)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MemoryImage;
    use tempfile::tempdir;

    fn source() -> Arc<dyn SourceImage> {
        Arc::new(
            MemoryImage::new()
                .with_file("PlMr.dat", b"mario".to_vec())
                .unwrap()
                .with_file("GrNBa.dat", b"battlefield".to_vec())
                .unwrap(),
        )
    }

    #[test]
    fn remove_of_overlay_only_file_drops_it() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::create(dir.path()).unwrap();
        let mut vfm = VirtualFileManager::new(source(), store);
        vfm.set("new.dat", b"x".to_vec()).unwrap();
        vfm.remove("new.dat").unwrap();
        assert!(vfm.modified_paths().is_empty());
        assert!(!vfm.exists("new.dat"));
    }

    #[test]
    fn remove_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::create(dir.path()).unwrap();
        let mut vfm = VirtualFileManager::new(source(), store);
        assert!(matches!(
            vfm.remove("nothing.dat"),
            Err(VfsError::NotFound { .. })
        ));
    }

    #[test]
    fn snapshot_is_isolated_from_later_sets() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::create(dir.path()).unwrap();
        let mut vfm = VirtualFileManager::new(source(), store);
        vfm.set("PlMr.dat", b"edited".to_vec()).unwrap();
        let snapshot = vfm.snapshot();
        vfm.set("PlMr.dat", b"later".to_vec()).unwrap();
        assert_eq!(snapshot.get("PlMr.dat").unwrap(), b"edited");
    }

    #[test]
    fn unique_path_skips_taken_names() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::create(dir.path()).unwrap();
        let mut vfm = VirtualFileManager::new(source(), store);
        assert_eq!(vfm.get_unique_file_path("PlWf.dat").unwrap(), "PlWf.dat");
        assert_eq!(vfm.get_unique_file_path("PlMr.dat").unwrap(), "PlMr_1.dat");
        vfm.set("PlMr_1.dat", b"a".to_vec()).unwrap();
        assert_eq!(vfm.get_unique_file_path("/PlMr.dat").unwrap(), "PlMr_2.dat");
    }
}
