//! Packed single-file disc backend.
//!
//! Layout (big-endian):
//!
//! ```text
//! +-------------------+
//! | Magic: "MEXI"     | 4 bytes
//! | Version           | u32
//! | File count        | u32
//! | Table offset      | u64
//! +-------------------+
//! | File data         | concatenated, in write order
//! +-------------------+
//! | File table        | per file: u16 path length, path, u64 offset, u64 size
//! +-------------------+
//! ```
//!
//! The table is written last, so a writer that never reaches
//! [`ImageSink::finalize`] leaves a file with a zeroed header that fails to
//! open.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, VfsError};
use crate::image::{DiscBackend, ImageSink, SourceImage};
use crate::path::normalize;

pub const PACKED_MAGIC: [u8; 4] = *b"MEXI";
pub const PACKED_VERSION: u32 = 1;
const HEADER_LEN: u64 = 20;

#[derive(Debug, Clone, Copy)]
struct Extent {
    offset: u64,
    size: u64,
}

/// A packed image opened for reading.
#[derive(Debug)]
pub struct PackedImage {
    path: PathBuf,
    files: BTreeMap<String, Extent>,
}

fn corrupt(path: &Path, reason: impl Into<String>) -> VfsError {
    VfsError::CorruptImage {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize, path: &Path) -> Result<&'a [u8]> {
    let end = cursor
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| corrupt(path, "file table is truncated"))?;
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn read_u16(bytes: &[u8], cursor: &mut usize, path: &Path) -> Result<u16> {
    let raw = take(bytes, cursor, 2, path)?;
    Ok(u16::from_be_bytes([raw[0], raw[1]]))
}

fn read_u64(bytes: &[u8], cursor: &mut usize, path: &Path) -> Result<u64> {
    let raw = take(bytes, cursor, 8, path)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(raw);
    Ok(u64::from_be_bytes(buf))
}

impl PackedImage {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| VfsError::io("open", path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| VfsError::io("read", path, e))?
            .len();

        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)
            .map_err(|_| corrupt(path, "file too small"))?;
        if header[0..4] != PACKED_MAGIC {
            return Err(corrupt(path, "not a packed disc image (invalid magic bytes)"));
        }
        let version = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if version != PACKED_VERSION {
            return Err(corrupt(path, format!("unsupported image version {version}")));
        }
        let count = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let mut offset_bytes = [0u8; 8];
        offset_bytes.copy_from_slice(&header[12..20]);
        let table_offset = u64::from_be_bytes(offset_bytes);
        if table_offset < HEADER_LEN || table_offset > file_len {
            return Err(corrupt(path, "file table offset is out of bounds"));
        }

        file.seek(SeekFrom::Start(table_offset))
            .map_err(|e| VfsError::io("read", path, e))?;
        let mut table = Vec::new();
        file.read_to_end(&mut table)
            .map_err(|e| VfsError::io("read", path, e))?;

        let mut cursor = 0;
        let mut files = BTreeMap::new();
        for _ in 0..count {
            let name_len = usize::from(read_u16(&table, &mut cursor, path)?);
            let name = take(&table, &mut cursor, name_len, path)?;
            let name = std::str::from_utf8(name)
                .map_err(|_| corrupt(path, "file name is not valid UTF-8"))?;
            let name = normalize(name).map_err(|_| corrupt(path, format!("bad file name '{name}'")))?;
            let extent = Extent {
                offset: read_u64(&table, &mut cursor, path)?,
                size: read_u64(&table, &mut cursor, path)?,
            };
            let in_bounds = extent.offset >= HEADER_LEN
                && extent
                    .offset
                    .checked_add(extent.size)
                    .is_some_and(|end| end <= table_offset);
            if !in_bounds {
                return Err(corrupt(path, format!("data of '{name}' is out of bounds")));
            }
            files.insert(name, extent);
        }

        debug!(path = %path.display(), files = files.len(), "opened packed image");
        Ok(Self {
            path: path.to_path_buf(),
            files,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceImage for PackedImage {
    fn list_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn open_file(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let extent = self.files.get(path).ok_or_else(|| VfsError::NotFound {
            path: path.to_string(),
        })?;
        let mut file = File::open(&self.path).map_err(|e| VfsError::io("open", &self.path, e))?;
        file.seek(SeekFrom::Start(extent.offset))
            .map_err(|e| VfsError::io("read", &self.path, e))?;
        Ok(Box::new(file.take(extent.size)))
    }
}

/// Writes a packed image.
#[derive(Debug)]
pub struct PackedWriter {
    path: PathBuf,
    out: BufWriter<File>,
    offset: u64,
    table: Vec<(String, Extent)>,
    seen: BTreeSet<String>,
}

impl PackedWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| VfsError::io("create", path, e))?;
        let mut out = BufWriter::new(file);
        out.write_all(&[0u8; HEADER_LEN as usize])
            .map_err(|e| VfsError::io("write", path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out,
            offset: HEADER_LEN,
            table: Vec::new(),
            seen: BTreeSet::new(),
        })
    }
}

impl ImageSink for PackedWriter {
    fn write_stream(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64> {
        let name = normalize(path)?;
        if !self.seen.insert(name.clone()) {
            return Err(VfsError::DuplicateEntry { path: name });
        }
        let size =
            std::io::copy(reader, &mut self.out).map_err(|e| VfsError::io("write", &self.path, e))?;
        self.table.push((
            name,
            Extent {
                offset: self.offset,
                size,
            },
        ));
        self.offset += size;
        Ok(size)
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        let Self {
            path,
            mut out,
            offset,
            table,
            ..
        } = *self;
        let write_err = |e| VfsError::io("write", &path, e);

        for (name, extent) in &table {
            let len = u16::try_from(name.len()).map_err(|_| VfsError::InvalidPath {
                path: name.clone(),
                reason: "path is too long",
            })?;
            out.write_all(&len.to_be_bytes()).map_err(write_err)?;
            out.write_all(name.as_bytes()).map_err(write_err)?;
            out.write_all(&extent.offset.to_be_bytes()).map_err(write_err)?;
            out.write_all(&extent.size.to_be_bytes()).map_err(write_err)?;
        }

        let mut file = out
            .into_inner()
            .map_err(|e| VfsError::io("write", &path, e.into_error()))?;
        let count = u32::try_from(table.len()).map_err(|_| VfsError::CorruptImage {
            path: path.clone(),
            reason: "too many files".to_string(),
        })?;
        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        header.extend_from_slice(&PACKED_MAGIC);
        header.extend_from_slice(&PACKED_VERSION.to_be_bytes());
        header.extend_from_slice(&count.to_be_bytes());
        header.extend_from_slice(&offset.to_be_bytes());
        file.seek(SeekFrom::Start(0)).map_err(write_err)?;
        file.write_all(&header).map_err(write_err)?;
        file.sync_all().map_err(|e| VfsError::io("sync", &path, e))?;

        debug!(path = %path.display(), files = table.len(), "finalized packed image");
        Ok(())
    }
}

/// [`DiscBackend`] for packed images.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedDiscBackend;

impl DiscBackend for PackedDiscBackend {
    fn open_source(&self, path: &Path) -> Result<Arc<dyn SourceImage>> {
        Ok(Arc::new(PackedImage::open(path)?))
    }

    fn begin_image(&self, path: &Path) -> Result<Box<dyn ImageSink>> {
        Ok(Box::new(PackedWriter::create(path)?))
    }
}

/// Writes every file of `source` into a new packed image at `path`.
pub fn write_packed(source: &dyn SourceImage, path: &Path) -> Result<()> {
    let mut writer = Box::new(PackedWriter::create(path)?);
    for name in source.list_files() {
        let mut reader = source.open_file(&name)?;
        writer.write_stream(&name, &mut reader)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MemoryImage;
    use tempfile::tempdir;

    #[test]
    fn packed_image_round_trips_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("game.mexi");
        let image = MemoryImage::new()
            .with_file("sys/main.dol", vec![0xAA; 64])
            .unwrap()
            .with_file("PlMr.dat", b"mario".to_vec())
            .unwrap()
            .with_file("empty.bin", Vec::new())
            .unwrap();
        write_packed(&image, &path).unwrap();

        let packed = PackedImage::open(&path).unwrap();
        assert_eq!(packed.list_files(), image.list_files());
        assert_eq!(packed.read_file("PlMr.dat").unwrap(), b"mario");
        assert_eq!(packed.read_file("sys/main.dol").unwrap(), vec![0xAA; 64]);
        assert!(packed.read_file("empty.bin").unwrap().is_empty());
    }

    #[test]
    fn unfinished_image_does_not_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.mexi");
        let mut writer = PackedWriter::create(&path).unwrap();
        writer.write_file("PlMr.dat", b"mario").unwrap();
        drop(writer);

        let err = PackedImage::open(&path).unwrap_err();
        assert!(matches!(err, VfsError::CorruptImage { .. }));
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = PackedWriter::create(&dir.path().join("dup.mexi")).unwrap();
        writer.write_file("PlMr.dat", b"a").unwrap();
        let err = writer.write_file("/PlMr.dat", b"b").unwrap_err();
        assert!(matches!(err, VfsError::DuplicateEntry { .. }));
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not-an-image.iso");
        std::fs::write(&path, b"NOT_A_PACKED_IMAGE_AT_ALL").unwrap();
        let err = PackedImage::open(&path).unwrap_err();
        assert!(matches!(err, VfsError::CorruptImage { .. }));
    }
}
