//! On-disk workspace layout.
//!
//! A workspace is a descriptor file plus its overlay store directory
//! (`<stem>.overlay` next to it). Either one without the other is an
//! inconsistent workspace.

use std::path::{Path, PathBuf};

use crate::error::{PersistenceError, Result};

const STORE_INDEX: &str = "index.json";

/// What exists on disk for a workspace path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    Absent,
    Complete,
    DescriptorOnly,
    StoreOnly,
}

/// Paths of one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub descriptor: PathBuf,
    pub store: PathBuf,
}

impl WorkspaceLayout {
    #[must_use]
    pub fn for_descriptor(descriptor: &Path) -> Self {
        let stem = descriptor
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string());
        Self {
            descriptor: descriptor.to_path_buf(),
            store: descriptor.with_file_name(format!("{stem}.overlay")),
        }
    }

    /// Sibling path of the optional settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.descriptor.with_file_name("mex.toml")
    }

    #[must_use]
    pub fn state(&self) -> LayoutState {
        let descriptor = self.descriptor.is_file();
        let store = self.store.join(STORE_INDEX).is_file();
        match (descriptor, store) {
            (false, false) if !self.store.exists() => LayoutState::Absent,
            (false, false) => LayoutState::StoreOnly,
            (true, true) => LayoutState::Complete,
            (true, false) => LayoutState::DescriptorOnly,
            (false, true) => LayoutState::StoreOnly,
        }
    }

    /// Fails unless both halves exist.
    pub fn require_complete(&self) -> Result<()> {
        match self.state() {
            LayoutState::Complete => Ok(()),
            LayoutState::Absent => Err(PersistenceError::DescriptorMissing {
                path: self.descriptor.clone(),
            }),
            LayoutState::DescriptorOnly => Err(self.inconsistent("file store")),
            LayoutState::StoreOnly => Err(self.inconsistent("descriptor")),
        }
    }

    /// Fails if anything already occupies either path.
    pub fn require_vacant(&self) -> Result<()> {
        if self.descriptor.exists() {
            return Err(PersistenceError::LayoutOccupied {
                path: self.descriptor.clone(),
            });
        }
        if self.store.exists() {
            return Err(PersistenceError::LayoutOccupied {
                path: self.store.clone(),
            });
        }
        Ok(())
    }

    fn inconsistent(&self, missing: &'static str) -> PersistenceError {
        PersistenceError::InconsistentLayout {
            descriptor: self.descriptor.clone(),
            store: self.store.clone(),
            missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn detects_each_state() {
        let dir = tempdir().unwrap();
        let layout = WorkspaceLayout::for_descriptor(&dir.path().join("build.json"));
        assert_eq!(layout.store, dir.path().join("build.overlay"));
        assert_eq!(layout.state(), LayoutState::Absent);
        assert!(layout.require_vacant().is_ok());

        fs::write(&layout.descriptor, b"{}").unwrap();
        assert_eq!(layout.state(), LayoutState::DescriptorOnly);
        assert!(matches!(
            layout.require_complete(),
            Err(PersistenceError::InconsistentLayout { missing: "file store", .. })
        ));

        fs::create_dir_all(&layout.store).unwrap();
        fs::write(layout.store.join(STORE_INDEX), b"{}").unwrap();
        assert_eq!(layout.state(), LayoutState::Complete);
        assert!(layout.require_complete().is_ok());
        assert!(layout.require_vacant().is_err());

        fs::remove_file(&layout.descriptor).unwrap();
        assert_eq!(layout.state(), LayoutState::StoreOnly);
    }

    #[test]
    fn absent_workspace_is_missing_not_corrupt() {
        let dir = tempdir().unwrap();
        let layout = WorkspaceLayout::for_descriptor(&dir.path().join("none.json"));
        assert!(matches!(
            layout.require_complete(),
            Err(PersistenceError::DescriptorMissing { .. })
        ));
    }
}
