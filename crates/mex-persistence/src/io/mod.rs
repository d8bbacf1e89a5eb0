//! File I/O operations for descriptor persistence.
//!
//! This module handles:
//! - Saving descriptors with atomic writes
//! - Loading descriptors with format validation
//! - Source image hashing for change detection

mod hash;
mod load;
mod save;

pub use hash::compute_file_hash;
pub use load::{load_project, parse_project_bytes};
pub use save::{save_project, serialize_project};
