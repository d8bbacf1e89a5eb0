//! Disc-relative path form shared by the model and the file overlay.

/// Normalizes a disc path to `/`-separated form without a leading slash.
///
/// Backslashes become slashes and repeated separators collapse. Empty paths
/// and `.`/`..` segments are rejected; the error is the reason.
pub fn normalize_path(path: &str) -> std::result::Result<String, &'static str> {
    let unified = path.replace('\\', "/");
    let mut parts = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" => {}
            "." | ".." => return Err("relative segments are not allowed"),
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err("path is empty");
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators() {
        assert_eq!(normalize_path("/audio\\us//main.ssm").unwrap(), "audio/us/main.ssm");
        assert_eq!(normalize_path("PlMr.dat").unwrap(), "PlMr.dat");
    }

    #[test]
    fn rejects_relative_and_empty() {
        assert!(normalize_path("audio/../sys/main.dol").is_err());
        assert!(normalize_path("./PlMr.dat").is_err());
        assert!(normalize_path("//").is_err());
        assert_eq!(normalize_path(""), Err("path is empty"));
    }
}
