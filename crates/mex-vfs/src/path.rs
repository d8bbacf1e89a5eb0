//! Disc-relative path handling.

use mex_model::normalize_path;

use crate::error::{Result, VfsError};

/// Normalizes a disc path to `/`-separated form without a leading slash.
///
/// Backslashes become slashes and repeated separators collapse. Empty paths
/// and `.`/`..` segments are rejected.
pub fn normalize(path: &str) -> Result<String> {
    normalize_path(path).map_err(|reason| VfsError::InvalidPath {
        path: path.to_string(),
        reason,
    })
}

/// Splits `dir/name.ext` into `("dir/", "name", ".ext")`.
pub(crate) fn split_name(path: &str) -> (&str, &str, &str) {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let (dir, name) = path.split_at(name_start);
    match name.rfind('.') {
        Some(dot) if dot > 0 => (dir, &name[..dot], &name[dot..]),
        _ => (dir, name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators() {
        assert_eq!(normalize("/audio\\us//main.ssm").unwrap(), "audio/us/main.ssm");
        assert_eq!(normalize("PlMr.dat").unwrap(), "PlMr.dat");
    }

    #[test]
    fn rejected_paths_carry_the_reason() {
        let err = normalize("./PlMr.dat").unwrap_err();
        assert!(matches!(
            err,
            VfsError::InvalidPath { reason: "relative segments are not allowed", .. }
        ));
        assert!(normalize("").is_err());
    }

    #[test]
    fn splits_names() {
        assert_eq!(split_name("fighters/PlMr.dat"), ("fighters/", "PlMr", ".dat"));
        assert_eq!(split_name("README"), ("", "README", ""));
        assert_eq!(split_name("dir/.hidden"), ("dir/", ".hidden", ""));
        assert_eq!(split_name("a.tar.gz"), ("", "a.tar", ".gz"));
    }
}
