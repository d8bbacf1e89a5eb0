//! Descriptor saving operations.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{PersistenceError, Result};
use crate::types::ProjectFile;

/// Save a descriptor.
///
/// Uses atomic write (temp file + rename) so a crash mid-write never
/// leaves a half-written descriptor.
pub fn save_project(project: &mut ProjectFile, path: &Path) -> Result<()> {
    project.touch();

    let bytes = serialize_project(project)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut file = File::create(&temp_path).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(&bytes).map_err(|e| PersistenceError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;

    file.sync_all().map_err(|e| PersistenceError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| PersistenceError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!("Saved workspace descriptor to {}", path.display());
    Ok(())
}

/// Serialize a descriptor to pretty-printed JSON.
pub fn serialize_project(project: &ProjectFile) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(project)
        .map_err(|source| PersistenceError::Serialization { source })?;
    bytes.push(b'\n');
    Ok(bytes)
}
