//! Disc image collaborators.
//!
//! The file manager reads the vanilla game through [`SourceImage`] and
//! export writes the new image through [`ImageSink`]. A [`DiscBackend`]
//! produces both from filesystem paths.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, VfsError};
use crate::path::normalize;

/// Read-only view of a disc image's file table.
pub trait SourceImage: Send + Sync {
    /// Every file path in the image, sorted.
    fn list_files(&self) -> Vec<String>;

    fn contains(&self, path: &str) -> bool {
        self.list_files().iter().any(|p| p == path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open_file(path)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| VfsError::io("read", path, e))?;
        Ok(bytes)
    }

    fn open_file(&self, path: &str) -> Result<Box<dyn Read + Send>>;
}

/// Writer for a new disc image.
pub trait ImageSink: Send {
    /// Streams one file into the image and returns the bytes written.
    fn write_stream(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64>;

    fn write_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut reader = bytes;
        self.write_stream(path, &mut reader).map(|_| ())
    }

    /// Completes the image. Nothing written before this call is guaranteed
    /// to be readable.
    fn finalize(self: Box<Self>) -> Result<()>;
}

/// Opens source images and begins output images at filesystem paths.
pub trait DiscBackend: Send + Sync {
    fn open_source(&self, path: &Path) -> Result<Arc<dyn SourceImage>>;

    fn begin_image(&self, path: &Path) -> Result<Box<dyn ImageSink>>;
}

/// In-memory image.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryImage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file. The path is normalized first.
    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let path = normalize(path)?;
        self.files.insert(path, Arc::from(bytes.into()));
        Ok(())
    }

    /// Builder form of [`MemoryImage::insert`].
    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        self.insert(path, bytes)?;
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceImage for MemoryImage {
    fn list_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| VfsError::NotFound {
                path: path.to_string(),
            })
    }

    fn open_file(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let bytes = self.files.get(path).ok_or_else(|| VfsError::NotFound {
            path: path.to_string(),
        })?;
        Ok(Box::new(Cursor::new(Arc::clone(bytes))))
    }
}
