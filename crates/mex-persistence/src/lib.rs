//! Workspace descriptor storage for mex projects.
//!
//! # Features
//!
//! - **Human-readable descriptors** as pretty-printed JSON
//! - **Atomic writes** to prevent data corruption
//! - **Missing vs. corrupt** distinction on load
//! - **Source change detection** via SHA-256 hashing
//! - **Layout checks** that keep the descriptor and overlay store together
//!
//! # File Format
//!
//! ```text
//! {
//!   "format": "mex-workspace",
//!   "schema_version": 1,
//!   "created_at": "...",        RFC 3339
//!   "last_saved_at": "...",
//!   "source": { "path": "...", "sha256": "..." },
//!   "project": { ... }
//! }
//! ```
//!
//! # Architecture
//!
//! - `types.rs` - Descriptor type
//! - `io/` - File I/O operations (save, load, hash)
//! - `layout.rs` - Descriptor + overlay store layout checks
//! - `dirty.rs` - Unsaved change tracking
//! - `error.rs` - Error types with user-friendly messages

mod dirty;
mod error;
mod io;
mod layout;
mod types;

pub use dirty::{Change, DirtyTracker};
pub use error::{PersistenceError, Result};
pub use io::{
    compute_file_hash, load_project, parse_project_bytes, save_project, serialize_project,
};
pub use layout::{LayoutState, WorkspaceLayout};
pub use types::{CURRENT_SCHEMA_VERSION, FORMAT_TAG, ProjectFile, SourceRef};
