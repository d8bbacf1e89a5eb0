//! DOL executable section map.
//!
//! ```text
//! 0x00  text file offsets   7 x u32
//! 0x1C  data file offsets  11 x u32
//! 0x48  text load addresses 7 x u32
//! 0x64  data load addresses 11 x u32
//! 0x90  text sizes          7 x u32
//! 0xAC  data sizes         11 x u32
//! 0xD8  bss address, bss size, entry point
//! ```
//!
//! All fields are big-endian. Sections with size zero are unused.

use crate::error::{BuildError, Result};

pub const TEXT_SECTIONS: usize = 7;
pub const DATA_SECTIONS: usize = 11;
pub const HEADER_SIZE: usize = 0x100;

const OFFSETS: usize = 0x00;
const ADDRESSES: usize = 0x48;
const SIZES: usize = 0x90;
const ENTRY_POINT: usize = 0xE0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Data,
}

/// One loaded section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub file_offset: u32,
    pub address: u32,
    pub size: u32,
}

impl Section {
    fn contains(&self, address: u32) -> bool {
        address >= self.address && u64::from(address) < self.end()
    }

    fn end(&self) -> u64 {
        u64::from(self.address) + u64::from(self.size)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// A DOL executable held in memory and patched in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DolImage {
    bytes: Vec<u8>,
    sections: Vec<Section>,
}

impl DolImage {
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(BuildError::InvalidExecutable {
                reason: format!("{} bytes is shorter than the DOL header", bytes.len()),
            });
        }

        let mut sections = Vec::new();
        for slot in 0..TEXT_SECTIONS + DATA_SECTIONS {
            let field = slot * 4;
            let size = read_u32(&bytes, SIZES + field);
            if size == 0 {
                continue;
            }
            let section = Section {
                kind: if slot < TEXT_SECTIONS {
                    SectionKind::Text
                } else {
                    SectionKind::Data
                },
                file_offset: read_u32(&bytes, OFFSETS + field),
                address: read_u32(&bytes, ADDRESSES + field),
                size,
            };
            let file_end = u64::from(section.file_offset) + u64::from(size);
            if file_end > bytes.len() as u64 {
                return Err(BuildError::InvalidExecutable {
                    reason: format!(
                        "section at {:#010X} runs past the end of the file",
                        section.address
                    ),
                });
            }
            sections.push(section);
        }

        if sections.is_empty() {
            return Err(BuildError::InvalidExecutable {
                reason: "no loadable sections".to_string(),
            });
        }
        Ok(Self { bytes, sections })
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn entry_point(&self) -> u32 {
        read_u32(&self.bytes, ENTRY_POINT)
    }

    /// File offset backing `len` bytes at RAM `address`, if a single section
    /// holds all of them.
    #[must_use]
    pub fn offset_of(&self, address: u32, len: usize) -> Option<usize> {
        let section = self.sections.iter().find(|s| s.contains(address))?;
        if u64::from(address) + len as u64 > section.end() {
            return None;
        }
        usize::try_from(section.file_offset + (address - section.address)).ok()
    }

    /// Reads `len` bytes at RAM `address`.
    #[must_use]
    pub fn read(&self, address: u32, len: usize) -> Option<&[u8]> {
        let offset = self.offset_of(address, len)?;
        self.bytes.get(offset..offset + len)
    }

    /// Overwrites memory at `address`. Returns `false` and leaves the image
    /// untouched when the range is not inside one section.
    pub fn write(&mut self, address: u32, data: &[u8]) -> bool {
        match self.offset_of(address, data.len()) {
            Some(offset) => {
                self.bytes[offset..offset + data.len()].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Lays out a DOL from section contents. Section data follows the header in
/// the order given: text sections first, then data sections.
pub fn build_dol(text: &[(u32, &[u8])], data: &[(u32, &[u8])], entry_point: u32) -> Result<Vec<u8>> {
    if text.len() > TEXT_SECTIONS || data.len() > DATA_SECTIONS {
        return Err(BuildError::InvalidExecutable {
            reason: format!(
                "{} text and {} data sections exceed the DOL limits",
                text.len(),
                data.len()
            ),
        });
    }

    let mut out = vec![0u8; HEADER_SIZE];
    let slots = text
        .iter()
        .enumerate()
        .chain(data.iter().enumerate().map(|(i, s)| (TEXT_SECTIONS + i, s)));
    for (slot, (address, contents)) in slots {
        let too_large = || BuildError::InvalidExecutable {
            reason: "section data exceeds 4 GiB".to_string(),
        };
        let offset = u32::try_from(out.len()).map_err(|_| too_large())?;
        let size = u32::try_from(contents.len()).map_err(|_| too_large())?;
        let field = slot * 4;
        out[OFFSETS + field..OFFSETS + field + 4].copy_from_slice(&offset.to_be_bytes());
        out[ADDRESSES + field..ADDRESSES + field + 4].copy_from_slice(&address.to_be_bytes());
        out[SIZES + field..SIZES + field + 4].copy_from_slice(&size.to_be_bytes());
        out.extend_from_slice(contents);
    }
    out[ENTRY_POINT..ENTRY_POINT + 4].copy_from_slice(&entry_point.to_be_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DolImage {
        let text = vec![0u8; 0x100];
        let data = vec![0xAAu8; 0x40];
        let bytes = build_dol(
            &[(0x8000_3100, &text[..])],
            &[(0x8040_0000, &data[..])],
            0x8000_3140,
        ).unwrap();
        DolImage::parse(bytes).unwrap()
    }

    #[test]
    fn maps_addresses_through_sections() {
        let dol = sample();
        assert_eq!(dol.sections().len(), 2);
        assert_eq!(dol.entry_point(), 0x8000_3140);
        assert_eq!(dol.offset_of(0x8000_3100, 4), Some(HEADER_SIZE));
        assert_eq!(dol.offset_of(0x8040_0010, 4), Some(HEADER_SIZE + 0x100 + 0x10));
        assert_eq!(dol.read(0x8040_0000, 2), Some(&[0xAA, 0xAA][..]));
    }

    #[test]
    fn rejects_writes_outside_or_across_sections() {
        let mut dol = sample();
        assert_eq!(dol.offset_of(0x8000_0000, 4), None);
        assert_eq!(dol.offset_of(0x8000_31FE, 4), None);
        let before = dol.clone();
        assert!(!dol.write(0x8000_31FE, &[1, 2, 3, 4]));
        assert_eq!(dol, before);
    }

    #[test]
    fn write_lands_at_file_offset() {
        let mut dol = sample();
        assert!(dol.write(0x8000_3104, &[0xDE, 0xAD]));
        assert_eq!(&dol.as_bytes()[HEADER_SIZE + 4..HEADER_SIZE + 6], &[0xDE, 0xAD]);
    }

    #[test]
    fn short_or_empty_files_are_invalid() {
        assert!(matches!(
            DolImage::parse(vec![0; 16]),
            Err(BuildError::InvalidExecutable { .. })
        ));
        assert!(matches!(
            DolImage::parse(vec![0; HEADER_SIZE]),
            Err(BuildError::InvalidExecutable { .. })
        ));
    }

    #[test]
    fn section_past_end_of_file_is_invalid() {
        let mut bytes = build_dol(&[(0x8000_3100, &[0u8; 8][..])], &[], 0).unwrap();
        bytes.truncate(HEADER_SIZE + 4);
        assert!(DolImage::parse(bytes).is_err());
    }
}
