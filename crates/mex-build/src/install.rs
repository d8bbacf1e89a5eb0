//! Code installation into the base executable.
//!
//! Codes are applied in a fixed order: the main code, then the project's
//! enabled codes in list order, then patch blobs in key order. When two
//! codes write the same bytes the later one wins and the overlap is
//! reported.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use mex_model::{CodeEntry, Project, Warning, WarningKind};
use tracing::{debug, info, warn};

use crate::dol::DolImage;
use crate::error::{BuildError, Result};
use crate::gecko::{self, CodeLine};

/// A named list of code lines ready to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSet {
    pub name: String,
    pub lines: Vec<CodeLine>,
}

impl CodeSet {
    pub fn new(name: impl Into<String>, lines: Vec<CodeLine>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }
}

/// Bytes written by one code and later rewritten by another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub address: u32,
    pub len: usize,
    pub earlier: String,
    pub later: String,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Names of the applied codes, in application order.
    pub applied: Vec<String>,
    pub bytes_written: usize,
    pub overlaps: Vec<Overlap>,
}

impl InstallReport {
    /// One warning per overlap.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.overlaps
            .iter()
            .map(|o| {
                Warning::new(
                    WarningKind::CodeOverride,
                    &o.later,
                    format!(
                        "overwrites {} bytes at {:#010X} written by '{}'",
                        o.len, o.address, o.earlier
                    ),
                )
            })
            .collect()
    }
}

/// Enabled project codes followed by patch blobs, in install order.
pub fn project_codes(project: &Project) -> Result<Vec<CodeSet>> {
    let mut sets = Vec::new();
    for code in project.codes().iter().filter(|c| c.enabled) {
        let lines = gecko::parse_code_lines(&code.name, &code.source)?;
        sets.push(CodeSet::new(code.name.clone(), lines));
    }
    for (name, blob) in project.patches() {
        let lines = gecko::parse_gct(name, blob.as_bytes())?;
        sets.push(CodeSet::new(name.clone(), lines));
    }
    Ok(sets)
}

/// Applies `main` and then `addons` to a copy of `base`.
///
/// The base executable is never modified. Any malformed code or write
/// outside the executable aborts the whole install.
pub fn install(base: &[u8], main: &CodeSet, addons: &[CodeSet]) -> Result<(Vec<u8>, InstallReport)> {
    let mut dol = DolImage::parse(base.to_vec())?;
    let mut report = InstallReport::default();
    let mut owners: HashMap<u32, usize> = HashMap::new();

    for (order, set) in std::iter::once(main).chain(addons).enumerate() {
        for write in gecko::compile(&set.name, &set.lines)? {
            if !dol.write(write.address, &write.bytes) {
                return Err(BuildError::UnmappedWrite {
                    code: set.name.clone(),
                    address: write.address,
                    len: write.bytes.len(),
                });
            }

            let mut overwritten: Vec<usize> = Vec::new();
            for address in (write.address..).take(write.bytes.len()) {
                if let Some(previous) = owners.insert(address, order)
                    && previous != order
                    && !overwritten.contains(&previous)
                {
                    overwritten.push(previous);
                }
            }
            for previous in overwritten {
                let earlier = report.applied[previous].clone();
                debug!(
                    address = write.address,
                    earlier = %earlier,
                    later = %set.name,
                    "code overwrites earlier code"
                );
                report.overlaps.push(Overlap {
                    address: write.address,
                    len: write.bytes.len(),
                    earlier,
                    later: set.name.clone(),
                });
            }
            report.bytes_written += write.bytes.len();
        }
        report.applied.push(set.name.clone());
    }

    info!(
        codes = report.applied.len(),
        bytes = report.bytes_written,
        overlaps = report.overlaps.len(),
        "installed codes"
    );
    Ok((dol.into_bytes(), report))
}

/// Reads and validates the main code file, returning it as a GCT.
pub fn load_main_code(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BuildError::MainCodeMissing {
            path: path.to_path_buf(),
        },
        _ => BuildError::io("read", path, e),
    })?;
    let lines = gecko::parse_code_file(&file_label(path), &bytes)?;
    Ok(gecko::encode_gct(&lines))
}

/// Reads addon code files. Files that are missing or unparsable become
/// warnings; the rest become project codes.
pub fn load_addon_codes(paths: &[PathBuf]) -> (Vec<CodeEntry>, Vec<Warning>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    for path in paths {
        let label = file_label(path);
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let warning = Warning::new(
                    WarningKind::MissingAddonCode,
                    path.display().to_string(),
                    format!("could not read addon code file: {e}"),
                );
                warn!(%warning, "skipping addon code");
                warnings.push(warning);
                continue;
            }
        };

        match parse_addon(&label, &bytes) {
            Ok((mut parsed, mut skipped)) => {
                entries.append(&mut parsed);
                warnings.append(&mut skipped);
            }
            Err(e) => {
                let warning = Warning::new(
                    WarningKind::UnreadableAddonCode,
                    path.display().to_string(),
                    e.user_message(),
                );
                warn!(%warning, "skipping addon code");
                warnings.push(warning);
            }
        }
    }
    (entries, warnings)
}

fn parse_addon(label: &str, bytes: &[u8]) -> Result<(Vec<CodeEntry>, Vec<Warning>)> {
    if bytes.starts_with(&gecko::GCT_HEADER) {
        let lines = gecko::parse_gct(label, bytes)?;
        gecko::compile(label, &lines)?;
        let entry = CodeEntry::new(label, gecko::format_lines(&lines));
        return Ok((vec![entry], Vec::new()));
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| BuildError::malformed(label, 0, "neither a GCT nor UTF-8 text"))?;
    let list = gecko::parse_code_list(label, text)?;
    let mut entries = Vec::new();
    for code in list.codes {
        gecko::compile(&code.name, &code.lines)?;
        entries.push(CodeEntry {
            author: code.author,
            description: code.description,
            ..CodeEntry::new(code.name, gecko::format_lines(&code.lines))
        });
    }
    Ok((entries, list.warnings))
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dol::{HEADER_SIZE, build_dol};
    use mex_model::PatchBlob;
    use mex_model::vanilla::seed_project;
    use tempfile::tempdir;

    fn base() -> Vec<u8> {
        build_dol(&[(0x8000_3100, &[0u8; 0x100][..])], &[], 0x8000_3100).unwrap()
    }

    fn write32(address: u32, value: u32) -> CodeLine {
        CodeLine::new(0x0400_0000 | (address & 0x01FF_FFFF), value)
    }

    #[test]
    fn later_codes_win_and_overlaps_are_reported() {
        let main = CodeSet::new("main", vec![write32(0x8000_3100, 0x1111_1111)]);
        let addons = [
            CodeSet::new("a", vec![write32(0x8000_3104, 0x2222_2222)]),
            CodeSet::new("b", vec![write32(0x8000_3100, 0x3333_3333)]),
        ];
        let original = base();
        let (patched, report) = install(&original, &main, &addons).unwrap();

        assert_eq!(&patched[HEADER_SIZE..HEADER_SIZE + 4], &[0x33; 4]);
        assert_eq!(&patched[HEADER_SIZE + 4..HEADER_SIZE + 8], &[0x22; 4]);
        assert_eq!(original, base());
        assert_eq!(report.applied, vec!["main", "a", "b"]);
        assert_eq!(report.overlaps.len(), 1);
        assert_eq!(report.overlaps[0].earlier, "main");
        assert_eq!(report.overlaps[0].later, "b");
        assert_eq!(report.warnings()[0].kind, WarningKind::CodeOverride);
    }

    #[test]
    fn write_outside_executable_aborts() {
        let main = CodeSet::new("main", vec![]);
        let addons = [CodeSet::new("stray", vec![write32(0x8040_0000, 1)])];
        let err = install(&base(), &main, &addons).unwrap_err();
        assert!(matches!(err, BuildError::UnmappedWrite { ref code, .. } if code == "stray"));
    }

    #[test]
    fn project_codes_follow_install_order() {
        let mut project = seed_project().unwrap();
        project.add_code(CodeEntry::new("first", "04003100 00000001")).unwrap();
        let mut disabled = CodeEntry::new("off", "04003100 00000002");
        disabled.enabled = false;
        project.add_code(disabled).unwrap();
        project.set_patch("z-blob", PatchBlob(gecko::encode_gct(&[])));
        project.set_patch("a-blob", PatchBlob(gecko::encode_gct(&[write32(0x8000_3108, 5)])));

        let names: Vec<String> = project_codes(&project)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["first", "a-blob", "z-blob"]);
    }

    #[test]
    fn missing_main_code_is_fatal() {
        let dir = tempdir().unwrap();
        let err = load_main_code(&dir.path().join("codes.gct")).unwrap_err();
        assert!(matches!(err, BuildError::MainCodeMissing { .. }));
    }

    #[test]
    fn text_main_code_is_stored_as_gct() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.txt");
        fs::write(&path, "$Main\n04003100 60000000\n").unwrap();
        let gct = load_main_code(&path).unwrap();
        assert!(gct.starts_with(&gecko::GCT_HEADER));
        assert_eq!(gecko::parse_gct("main", &gct).unwrap().len(), 1);
    }

    #[test]
    fn bad_addons_become_warnings() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.txt");
        fs::write(&good, "$Good [me]\n*desc\n04003100 00000001\n").unwrap();
        fs::write(&bad, "$Bad\nC2003100 00000001\n").unwrap();

        let (entries, warnings) =
            load_addon_codes(&[good, bad, dir.path().join("missing.gct")]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Good");
        assert_eq!(entries[0].author, "me");
        let kinds: Vec<WarningKind> = warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::UnreadableAddonCode, WarningKind::MissingAddonCode]
        );
    }

    #[test]
    fn empty_addon_codes_are_reported_by_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("extras.txt");
        fs::write(&path, "$Unfinished\n$Works\n04003100 00000001\n").unwrap();

        let (entries, warnings) = load_addon_codes(&[path]);
        assert_eq!(entries.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::EmptyCode);
        assert_eq!(warnings[0].subject, "Unfinished");
        assert!(warnings[0].message.contains("extras"));
    }
}
