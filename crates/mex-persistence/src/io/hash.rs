//! Source image fingerprints.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{PersistenceError, Result};

/// SHA-256 of a source image, as lowercase hex.
///
/// Images run to gigabytes, so the file is streamed into the hasher.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let read_error = |source: io::Error| match source.kind() {
        io::ErrorKind::NotFound => PersistenceError::SourceFileMissing {
            path: path.to_path_buf(),
        },
        _ => PersistenceError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source,
        },
    };

    let mut image = BufReader::with_capacity(1 << 20, File::open(path).map_err(read_error)?);
    let mut hasher = Sha256::new();
    io::copy(&mut image, &mut hasher).map_err(read_error)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("melee.mexi");
        fs::write(&image, b"GALE01").unwrap();

        let first = compute_file_hash(&image).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(compute_file_hash(&image).unwrap(), first);

        fs::write(&image, b"GALE02").unwrap();
        assert_ne!(compute_file_hash(&image).unwrap(), first);
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempdir().unwrap();
        let err = compute_file_hash(&dir.path().join("game.iso")).unwrap_err();
        assert!(matches!(err, PersistenceError::SourceFileMissing { .. }));
    }
}
