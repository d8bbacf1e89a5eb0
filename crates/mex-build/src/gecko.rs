//! Gecko code lists.
//!
//! Text form:
//!
//! ```text
//! $Skip Intro [someone]
//! *Boots straight to the menu
//! 04123456 60000000
//! # comments and blank lines are ignored
//! ```
//!
//! Binary form (GCT) is the same line pairs between an `00D0C0DE00D0C0DE`
//! header and an `F000000000000000` terminator.
//!
//! Only codes that write fixed bytes can be applied to the executable file
//! ahead of time, so compilation accepts code types `00`, `02`, `04` and `06`
//! with base-address addressing and rejects everything else.

use std::fmt::Write as _;

use mex_model::{Warning, WarningKind};
use tracing::warn;

use crate::error::{BuildError, Result};

pub const GCT_HEADER: [u8; 8] = [0x00, 0xD0, 0xC0, 0xDE, 0x00, 0xD0, 0xC0, 0xDE];
pub const GCT_TERMINATOR: [u8; 8] = [0xF0, 0, 0, 0, 0, 0, 0, 0];

const RAM_BASE: u32 = 0x8000_0000;
const ADDRESS_MASK: u32 = 0x01FF_FFFF;

/// One 8-byte code line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLine {
    pub hi: u32,
    pub lo: u32,
}

impl CodeLine {
    #[must_use]
    pub const fn new(hi: u32, lo: u32) -> Self {
        Self { hi, lo }
    }

    fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.hi.to_be_bytes());
        out[4..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }
}

/// A named code parsed from a text code list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeckoCode {
    pub name: String,
    pub author: String,
    pub description: String,
    pub lines: Vec<CodeLine>,
}

/// A fixed write into RAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWrite {
    pub address: u32,
    pub bytes: Vec<u8>,
}

fn parse_hex_word(word: &str) -> Option<u32> {
    if word.len() != 8 {
        return None;
    }
    u32::from_str_radix(word, 16).ok()
}

fn parse_line(code: &str, number: usize, line: &str) -> Result<CodeLine> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(hi), Some(lo), None) => match (parse_hex_word(hi), parse_hex_word(lo)) {
            (Some(hi), Some(lo)) => Ok(CodeLine::new(hi, lo)),
            _ => Err(BuildError::malformed(code, number, format!("'{line}' is not two hex words"))),
        },
        _ => Err(BuildError::malformed(code, number, format!("'{line}' is not a code line"))),
    }
}

/// Splits `$Name [Author]` into name and author.
fn parse_header(header: &str) -> (String, String) {
    let header = header.trim();
    if let Some(open) = header.rfind('[')
        && header.ends_with(']')
    {
        let name = header[..open].trim().to_string();
        let author = header[open + 1..header.len() - 1].trim().to_string();
        return (name, author);
    }
    (header.to_string(), String::new())
}

/// Codes parsed from a text list, plus the soft problems found on the way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeList {
    pub codes: Vec<GeckoCode>,
    pub warnings: Vec<Warning>,
}

impl CodeList {
    /// Keeps `code` if it has lines. A header or description with no lines
    /// is reported and skipped.
    fn finish(&mut self, code: GeckoCode, started: bool, list: &str) {
        if !code.lines.is_empty() {
            self.codes.push(code);
        } else if started {
            let warning = Warning::new(
                WarningKind::EmptyCode,
                code.name,
                format!("code in '{list}' has no code lines and was ignored"),
            );
            warn!(%warning, "skipping empty code");
            self.warnings.push(warning);
        }
    }
}

/// Parses a text code list. Lines before the first `$` header form a code
/// named `fallback_name`.
pub fn parse_code_list(fallback_name: &str, text: &str) -> Result<CodeList> {
    let mut list = CodeList::default();
    let mut current = GeckoCode {
        name: fallback_name.to_string(),
        ..GeckoCode::default()
    };
    let mut started = false;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(header) = line.strip_prefix('$') {
            let finished = std::mem::take(&mut current);
            list.finish(finished, started, fallback_name);
            (current.name, current.author) = parse_header(header);
            started = true;
            continue;
        }
        if let Some(description) = line.strip_prefix('*') {
            if !current.description.is_empty() {
                current.description.push('\n');
            }
            current.description.push_str(description.trim());
            started = true;
            continue;
        }
        current.lines.push(parse_line(&current.name, index + 1, line)?);
    }

    list.finish(current, started, fallback_name);
    Ok(list)
}

/// Parses the code lines of a single code, ignoring any headers.
pub fn parse_code_lines(name: &str, text: &str) -> Result<Vec<CodeLine>> {
    Ok(parse_code_list(name, text)?
        .codes
        .into_iter()
        .flat_map(|code| code.lines)
        .collect())
}

/// Parses a binary GCT.
pub fn parse_gct(name: &str, bytes: &[u8]) -> Result<Vec<CodeLine>> {
    if bytes.len() < GCT_HEADER.len() || bytes[..8] != GCT_HEADER {
        return Err(BuildError::malformed(name, 0, "missing GCT header"));
    }
    let body = &bytes[8..];
    if body.len() % 8 != 0 {
        return Err(BuildError::malformed(
            name,
            0,
            format!("GCT body of {} bytes is not a whole number of lines", body.len()),
        ));
    }

    let mut lines = Vec::new();
    for chunk in body.chunks_exact(8) {
        if chunk == GCT_TERMINATOR {
            return Ok(lines);
        }
        let hi = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let lo = u32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        lines.push(CodeLine::new(hi, lo));
    }
    Err(BuildError::malformed(name, lines.len() + 1, "missing GCT terminator"))
}

/// Parses a code file in either form, detected by the GCT header.
pub fn parse_code_file(name: &str, bytes: &[u8]) -> Result<Vec<CodeLine>> {
    if bytes.starts_with(&GCT_HEADER) {
        return parse_gct(name, bytes);
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|_| BuildError::malformed(name, 0, "neither a GCT nor UTF-8 text"))?;
    parse_code_lines(name, text)
}

/// Encodes lines as a GCT.
#[must_use]
pub fn encode_gct(lines: &[CodeLine]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + lines.len() * 8);
    out.extend_from_slice(&GCT_HEADER);
    for line in lines {
        out.extend_from_slice(&line.to_bytes());
    }
    out.extend_from_slice(&GCT_TERMINATOR);
    out
}

/// Renders lines in text form, one `XXXXXXXX YYYYYYYY` pair per line.
#[must_use]
pub fn format_lines(lines: &[CodeLine]) -> String {
    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "{:08X} {:08X}", line.hi, line.lo);
    }
    out
}

fn fill(value: &[u8], count: u32) -> Vec<u8> {
    let repeats = count as usize + 1;
    value.repeat(repeats)
}

/// Turns code lines into fixed memory writes.
pub fn compile(name: &str, lines: &[CodeLine]) -> Result<Vec<MemoryWrite>> {
    let mut writes = Vec::new();
    let mut index = 0;
    while index < lines.len() {
        let line = lines[index];
        let number = index + 1;
        // Bit 0 of the type byte is address bit 24.
        let code_type = (line.hi >> 24) & 0xFE;
        let address = RAM_BASE | (line.hi & ADDRESS_MASK);
        index += 1;

        let bytes = match code_type {
            0x00 => {
                if line.lo & 0x0000_FF00 != 0 {
                    return Err(BuildError::malformed(name, number, "8-bit fill has stray bits"));
                }
                fill(&[(line.lo & 0xFF) as u8], line.lo >> 16)
            }
            0x02 => fill(&((line.lo & 0xFFFF) as u16).to_be_bytes(), line.lo >> 16),
            0x04 => line.lo.to_be_bytes().to_vec(),
            0x06 => {
                let len = line.lo as usize;
                let needed = len.div_ceil(8);
                if index + needed > lines.len() {
                    return Err(BuildError::malformed(
                        name,
                        number,
                        format!("byte string of {len} bytes is truncated"),
                    ));
                }
                let mut data: Vec<u8> = lines[index..index + needed]
                    .iter()
                    .flat_map(|l| l.to_bytes())
                    .collect();
                data.truncate(len);
                index += needed;
                data
            }
            0x10 | 0x12 | 0x14 | 0x16 => {
                return Err(BuildError::malformed(
                    name,
                    number,
                    "pointer-relative writes cannot be applied to the executable",
                ));
            }
            other => {
                return Err(BuildError::malformed(
                    name,
                    number,
                    format!("unsupported code type {other:02X}"),
                ));
            }
        };
        writes.push(MemoryWrite { address, bytes });
    }
    Ok(writes)
}
