//! Reads the unmodified game into a fresh project.

use mex_model::vanilla::{self, seed_project};
use mex_model::{Costume, Project};
use mex_vfs::SourceImage;
use tracing::{debug, info};

use crate::dol::DolImage;
use crate::error::{BuildError, Result};

/// Costume colour suffixes in the order the game lists them.
const COLOR_ORDER: &[&str] = &[
    "Nr", "Re", "Bu", "Gr", "Ye", "Bk", "Wh", "Pi", "Or", "La", "Aq", "Gy", "Nv",
];

fn color_rank(suffix: &str) -> usize {
    COLOR_ORDER
        .iter()
        .position(|c| *c == suffix)
        .unwrap_or(COLOR_ORDER.len())
}

/// Costume files of one fighter code, as `(suffix, path)` in display order.
///
/// A costume file is `Pl{code}{Xx}.dat` in the image root, where `Xx` is an
/// uppercase then a lowercase ASCII letter.
fn costume_files<'a>(code: &str, files: &'a [String]) -> Vec<(&'a str, &'a str)> {
    let prefix = format!("Pl{code}");
    let mut found: Vec<(&str, &str)> = files
        .iter()
        .filter_map(|path| {
            let suffix = path.strip_prefix(prefix.as_str())?.strip_suffix(".dat")?;
            let bytes = suffix.as_bytes();
            (bytes.len() == 2 && bytes[0].is_ascii_uppercase() && bytes[1].is_ascii_lowercase())
                .then_some((suffix, path.as_str()))
        })
        .collect();
    found.sort_by(|a, b| color_rank(a.0).cmp(&color_rank(b.0)).then(a.0.cmp(b.0)));
    found
}

/// Builds the identity-mapped project of the game in `source`.
///
/// Only the executable at `executable` has to be present and valid. Roster
/// files are not checked here; export verifies them.
pub fn extract_vanilla(source: &dyn SourceImage, executable: &str) -> Result<Project> {
    let bytes = source.read_file(executable)?;
    let dol = DolImage::parse(bytes).map_err(|e| match e {
        BuildError::InvalidExecutable { reason } => BuildError::InvalidExecutable {
            reason: format!("{executable}: {reason}"),
        },
        other => other,
    })?;
    debug!(sections = dol.sections().len(), "read base executable");

    let mut project = seed_project()?;
    let files = source.list_files();
    let mut costumes = 0usize;
    for (index, fighter) in vanilla::FIGHTERS.iter().enumerate() {
        for (suffix, path) in costume_files(fighter.code, &files) {
            project.add_costume(index, Costume::new(suffix, path))?;
            costumes += 1;
        }
    }

    info!(
        fighters = project.fighters().len(),
        stages = project.stages().len(),
        costumes,
        "extracted vanilla project"
    );
    Ok(project)
}
