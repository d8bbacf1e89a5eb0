//! Copy-on-write file overlay over a read-only game disc image.
//!
//! # Overview
//!
//! Re-extracting or rewriting a multi-gigabyte image per edit is not an
//! option, so every edit goes through a [`VirtualFileManager`]: reads check
//! the overlay first and fall through to the [`SourceImage`], writes cost
//! the size of the edit. [`VirtualFileManager::save`] persists the overlay
//! into a workspace-local [`OverlayStore`].
//!
//! # Architecture
//!
//! - `path.rs` - Disc path normalization
//! - `image.rs` - Source image / image writer collaborator traits, in-memory image
//! - `packed.rs` - Packed single-file disc backend
//! - `store.rs` - Overlay store (index + content-addressed blobs)
//! - `vfm.rs` - The virtual file manager and its read-only snapshots
//! - `error.rs` - Error types with user-friendly messages

mod error;
mod image;
mod packed;
mod path;
mod store;
mod vfm;

pub use error::{Result, VfsError};
pub use image::{DiscBackend, ImageSink, MemoryImage, SourceImage};
pub use packed::{
    PACKED_MAGIC, PACKED_VERSION, PackedDiscBackend, PackedImage, PackedWriter, write_packed,
};
pub use path::normalize;
pub use store::{OverlayStore, STORE_INDEX_VERSION, StoreIndex, StoredEntry, sha256_hex};
pub use vfm::{VfsSnapshot, VirtualFileManager};
