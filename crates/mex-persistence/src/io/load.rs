//! Descriptor loading operations.

use std::fs;
use std::path::Path;

use crate::error::{PersistenceError, Result};
use crate::types::{CURRENT_SCHEMA_VERSION, FORMAT_TAG, ProjectFile};

/// Load a descriptor.
///
/// A missing file is [`PersistenceError::DescriptorMissing`]; a file that
/// exists but cannot be parsed is [`PersistenceError::InvalidFormat`].
pub fn load_project(path: &Path) -> Result<ProjectFile> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PersistenceError::DescriptorMissing {
            path: path.to_path_buf(),
        },
        _ => PersistenceError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let project = parse_project_bytes(&bytes, path)?;
    tracing::info!("Loaded workspace descriptor from {}", path.display());
    Ok(project)
}

/// Parse descriptor bytes and validate the format.
///
/// `path` is only used for error context.
pub fn parse_project_bytes(bytes: &[u8], path: &Path) -> Result<ProjectFile> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    // Check the format tag and version before the full parse, so a newer
    // descriptor reports its version instead of a field error.
    if value.get("format").and_then(serde_json::Value::as_str) != Some(FORMAT_TAG) {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "not a mex workspace descriptor".to_string(),
        });
    }
    let version = value
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "schema_version is missing".to_string(),
        })?;
    if version > CURRENT_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: version,
            max_supported: CURRENT_SCHEMA_VERSION,
            path: path.to_path_buf(),
        });
    }

    let project: ProjectFile =
        serde_json::from_value(value).map_err(|e| PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    project
        .project
        .validate()
        .map_err(|source| PersistenceError::InvalidProject {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::save::save_project;
    use crate::types::SourceRef;
    use mex_model::vanilla::seed_project;
    use mex_model::{ErrorKind, Fighter};
    use tempfile::tempdir;

    #[test]
    fn test_load_project_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build.json");

        let mut model = seed_project().unwrap();
        model.add_fighter(Fighter::new("Wolf", "PlWf.dat")).unwrap();
        model.build.name = "Wolf build".to_string();
        let mut project = ProjectFile::new(
            SourceRef {
                path: "melee.mexi".to_string(),
                sha256: Some("ab".repeat(32)),
            },
            model,
        );

        save_project(&mut project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded, project);
        assert!(loaded.last_saved_at().is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_project(&dir.path().join("absent.json"));
        assert!(matches!(
            result,
            Err(PersistenceError::DescriptorMissing { .. })
        ));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, b"NOT_A_DESCRIPTOR").unwrap();

        let err = load_project(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidFormat { .. }));
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn test_load_foreign_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, br#"{"name":"not-a-workspace"}"#).unwrap();

        assert!(matches!(
            load_project(&path),
            Err(PersistenceError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_load_unsupported_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.json");
        fs::write(
            &path,
            format!(r#"{{"format":"{FORMAT_TAG}","schema_version":999}}"#),
        )
        .unwrap();

        assert!(matches!(
            load_project(&path),
            Err(PersistenceError::UnsupportedVersion { .. })
        ));
    }
}
