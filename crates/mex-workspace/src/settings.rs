//! Per-workspace settings.
//!
//! Read from an optional `mex.toml` next to the descriptor:
//!
//! ```toml
//! [image]
//! executable = "sys/main.dol"
//! main_code = "codes.gct"
//! id_tables = "MxDt.dat"
//! embedded_descriptor = "mex/project.json"
//! verify_references = true
//! ```

use std::fs;
use std::path::Path;

use mex_build::ImageLayout;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, WorkspaceError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Where the engine's own files live inside the image.
    pub image: ImageLayout,
}

impl WorkspaceSettings {
    /// Loads settings from `path`. A missing file means defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let settings =
                    toml::from_str(&content).map_err(|source| WorkspaceError::InvalidSettings {
                        path: path.to_path_buf(),
                        source,
                    })?;
                info!(path = %path.display(), "loaded workspace settings");
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(WorkspaceError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|source| WorkspaceError::SettingsSerialization { source })?;
        fs::write(path, content).map_err(|source| WorkspaceError::Io {
            operation: "write",
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "saved workspace settings");
        Ok(())
    }
}
