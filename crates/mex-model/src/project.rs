//! The project graph.
//!
//! Collection order is the internal index space. Nothing here renumbers
//! entries implicitly: only the add/remove/move operations change order, and
//! each of them rewrites every cross reference into the changed collection
//! before returning.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::code::{AssetKind, CodeEntry, PatchBlob};
use crate::entries::{Costume, Fighter, MusicTrack, Series, SkinLink, SoundGroup, Stage};
use crate::error::{ModelError, Result};
use crate::path::normalize_path;
use crate::roster::{Roster, RosterEntry};

/// Build metadata shown in the game's banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub name: String,
    pub version: String,
    pub maker: String,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            name: "m-ex build".to_string(),
            version: "1.0.0".to_string(),
            maker: String::new(),
        }
    }
}

/// How a structural mutation moved indices of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexChange {
    Removed(usize),
    Moved { from: usize, to: usize },
}

impl IndexChange {
    /// New position of `index`, or `None` if its target is gone.
    fn apply(self, index: usize) -> Option<usize> {
        match self {
            Self::Removed(k) => match index.cmp(&k) {
                Ordering::Less => Some(index),
                Ordering::Equal => None,
                Ordering::Greater => Some(index - 1),
            },
            Self::Moved { from, to } => {
                if index == from {
                    Some(to)
                } else if from < to && index > from && index <= to {
                    Some(index - 1)
                } else if to < from && index >= to && index < from {
                    Some(index + 1)
                } else {
                    Some(index)
                }
            }
        }
    }
}

fn remap_opt(slot: &mut Option<usize>, change: IndexChange) {
    if let Some(index) = *slot {
        *slot = change.apply(index);
    }
}

fn remap_list(list: &mut Vec<usize>, change: IndexChange) {
    *list = list.iter().filter_map(|&i| change.apply(i)).collect();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub build: BuildInfo,
    fighters: Roster<Fighter>,
    stages: Roster<Stage>,
    music: Roster<MusicTrack>,
    sound_groups: Roster<SoundGroup>,
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    codes: Vec<CodeEntry>,
    #[serde(default)]
    patches: BTreeMap<String, PatchBlob>,
    /// Overlay paths that still need a codec pass before export.
    #[serde(default)]
    unbaked: BTreeMap<String, AssetKind>,
}

impl Project {
    /// Assembles a project from complete rosters and validates it.
    pub fn from_rosters(
        build: BuildInfo,
        fighters: Vec<Fighter>,
        stages: Vec<Stage>,
        music: Vec<MusicTrack>,
        sound_groups: Vec<SoundGroup>,
        series: Vec<Series>,
    ) -> Result<Self> {
        let project = Self {
            build,
            fighters: Roster::from_entries(fighters),
            stages: Roster::from_entries(stages),
            music: Roster::from_entries(music),
            sound_groups: Roster::from_entries(sound_groups),
            series,
            codes: Vec::new(),
            patches: BTreeMap::new(),
            unbaked: BTreeMap::new(),
        };
        project.validate()?;
        Ok(project)
    }

    // Accessors

    #[must_use]
    pub fn fighters(&self) -> &Roster<Fighter> {
        &self.fighters
    }

    #[must_use]
    pub fn stages(&self) -> &Roster<Stage> {
        &self.stages
    }

    #[must_use]
    pub fn music(&self) -> &Roster<MusicTrack> {
        &self.music
    }

    #[must_use]
    pub fn sound_groups(&self) -> &Roster<SoundGroup> {
        &self.sound_groups
    }

    #[must_use]
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    #[must_use]
    pub fn codes(&self) -> &[CodeEntry] {
        &self.codes
    }

    #[must_use]
    pub fn patches(&self) -> &BTreeMap<String, PatchBlob> {
        &self.patches
    }

    #[must_use]
    pub fn unbaked(&self) -> &BTreeMap<String, AssetKind> {
        &self.unbaked
    }

    /// Every image path referenced by a roster entry, in roster order.
    #[must_use]
    pub fn file_refs(&self) -> Vec<(String, &str)> {
        fn collect<'a, T: RosterEntry>(roster: &'a Roster<T>, out: &mut Vec<(String, &'a str)>) {
            for (index, entry) in roster.iter().enumerate() {
                for path in entry.file_refs() {
                    out.push((format!("{} {index} ({})", T::KIND, entry.name()), path));
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.fighters, &mut out);
        collect(&self.stages, &mut out);
        collect(&self.music, &mut out);
        collect(&self.sound_groups, &mut out);
        out
    }

    // Validation

    /// Checks roster sizes and cross references.
    pub fn validate(&self) -> Result<()> {
        self.fighters.validate_size()?;
        self.stages.validate_size()?;
        self.music.validate_size()?;
        self.sound_groups.validate_size()?;
        match self.dangling_references().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every cross reference whose target does not exist.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<ModelError> {
        let mut found = Vec::new();
        for (index, fighter) in self.fighters.iter().enumerate() {
            let owner = format!("fighter {index} ({})", fighter.name);
            self.check_fighter_refs(fighter, &owner, &mut found);
        }
        for (index, stage) in self.stages.iter().enumerate() {
            let owner = format!("stage {index} ({})", stage.name);
            self.check_stage_refs(stage, &owner, &mut found);
        }
        found
    }

    fn check_fighter_refs(&self, fighter: &Fighter, owner: &str, found: &mut Vec<ModelError>) {
        Self::check_opt(owner, "series", fighter.series, self.series.len(), found);
        Self::check_opt(owner, "sound group", fighter.sound_bank, self.sound_groups.len(), found);
        Self::check_opt(owner, "music track", fighter.victory_theme, self.music.len(), found);
        for costume in &fighter.costumes {
            if let Some(link) = costume.shared_skin
                && !self.link_exists(link)
            {
                found.push(ModelError::DanglingReference {
                    owner: format!("{owner} costume '{}'", costume.name),
                    target: "costume",
                    index: link.costume,
                });
            }
        }
    }

    fn check_stage_refs(&self, stage: &Stage, owner: &str, found: &mut Vec<ModelError>) {
        Self::check_opt(owner, "series", stage.series, self.series.len(), found);
        Self::check_opt(owner, "sound group", stage.sound_bank, self.sound_groups.len(), found);
        for &track in &stage.playlist {
            Self::check_opt(owner, "music track", Some(track), self.music.len(), found);
        }
    }

    fn check_opt(
        owner: &str,
        target: &'static str,
        index: Option<usize>,
        len: usize,
        found: &mut Vec<ModelError>,
    ) {
        if let Some(index) = index
            && index >= len
        {
            found.push(ModelError::DanglingReference {
                owner: owner.to_string(),
                target,
                index,
            });
        }
    }

    fn link_exists(&self, link: SkinLink) -> bool {
        self.fighters
            .get(link.fighter)
            .is_some_and(|f| link.costume < f.costumes.len())
    }

    fn first_dangling(found: Vec<ModelError>) -> Result<()> {
        match found.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // Fighters

    /// Appends an extended fighter and returns its internal index.
    ///
    /// Skin links on the new fighter's own costumes may point at the index
    /// it is about to take.
    pub fn add_fighter(&mut self, fighter: Fighter) -> Result<usize> {
        let mut found = Vec::new();
        let owner = format!("new fighter ({})", fighter.name);
        let new_index = self.fighters.len();
        for costume in &fighter.costumes {
            if let Some(link) = costume.shared_skin {
                let ok = if link.fighter == new_index {
                    link.costume < fighter.costumes.len()
                } else {
                    self.link_exists(link)
                };
                if !ok {
                    found.push(ModelError::DanglingReference {
                        owner: format!("{owner} costume '{}'", costume.name),
                        target: "costume",
                        index: link.costume,
                    });
                }
            }
        }
        let bare = Fighter {
            costumes: Vec::new(),
            ..fighter.clone()
        };
        self.check_fighter_refs(&bare, &owner, &mut found);
        Self::first_dangling(found)?;

        let index = self.fighters.push(fighter)?;
        debug!(index, "added fighter");
        Ok(index)
    }

    /// Removes an extended fighter. Costume links that pointed at it are
    /// cleared; links to fighters above it shift down.
    pub fn remove_fighter(&mut self, index: usize) -> Result<Fighter> {
        let removed = self.fighters.remove(index)?;
        self.remap_fighter_links(IndexChange::Removed(index));
        self.release_files(removed.file_refs());
        debug!(index, name = %removed.name, "removed fighter");
        Ok(removed)
    }

    pub fn move_fighter(&mut self, from: usize, to: usize) -> Result<()> {
        self.fighters.move_entry(from, to)?;
        self.remap_fighter_links(IndexChange::Moved { from, to });
        Ok(())
    }

    fn remap_fighter_links(&mut self, change: IndexChange) {
        for fighter in self.fighters.iter_mut() {
            for costume in &mut fighter.costumes {
                if let Some(link) = costume.shared_skin {
                    costume.shared_skin = change
                        .apply(link.fighter)
                        .map(|fighter| SkinLink { fighter, ..link });
                }
            }
        }
    }

    // Costumes

    /// Appends a costume to any fighter, vanilla included.
    pub fn add_costume(&mut self, fighter: usize, costume: Costume) -> Result<usize> {
        let own_len = self.fighters.try_get(fighter)?.costumes.len();
        if let Some(link) = costume.shared_skin {
            let ok = if link.fighter == fighter {
                link.costume < own_len
            } else {
                self.link_exists(link)
            };
            if !ok {
                return Err(ModelError::DanglingReference {
                    owner: format!("new costume '{}'", costume.name),
                    target: "costume",
                    index: link.costume,
                });
            }
        }
        let entry = self.fighters.try_get_mut(fighter)?;
        entry.costumes.push(costume);
        Ok(entry.costumes.len() - 1)
    }

    pub fn remove_costume(&mut self, fighter: usize, costume: usize) -> Result<Costume> {
        let entry = self.fighters.try_get_mut(fighter)?;
        if costume >= entry.costumes.len() {
            return Err(ModelError::CostumeNotFound { fighter, costume });
        }
        let removed = entry.costumes.remove(costume);

        let change = IndexChange::Removed(costume);
        for owner in self.fighters.iter_mut() {
            for c in &mut owner.costumes {
                if let Some(link) = c.shared_skin
                    && link.fighter == fighter
                {
                    c.shared_skin = change
                        .apply(link.costume)
                        .map(|costume| SkinLink { costume, ..link });
                }
            }
        }
        self.release_files(removed.file_refs());
        Ok(removed)
    }

    // Stages

    pub fn add_stage(&mut self, stage: Stage) -> Result<usize> {
        let mut found = Vec::new();
        self.check_stage_refs(&stage, &format!("new stage ({})", stage.name), &mut found);
        Self::first_dangling(found)?;
        let index = self.stages.push(stage)?;
        debug!(index, "added stage");
        Ok(index)
    }

    pub fn remove_stage(&mut self, index: usize) -> Result<Stage> {
        let removed = self.stages.remove(index)?;
        self.release_files(removed.file_refs());
        debug!(index, name = %removed.name, "removed stage");
        Ok(removed)
    }

    pub fn move_stage(&mut self, from: usize, to: usize) -> Result<()> {
        self.stages.move_entry(from, to)
    }

    // Music

    pub fn add_music(&mut self, track: MusicTrack) -> Result<usize> {
        let index = self.music.push(track)?;
        debug!(index, "added music track");
        Ok(index)
    }

    /// Removes an extended track, dropping it from victory themes and
    /// stage playlists.
    pub fn remove_music(&mut self, index: usize) -> Result<MusicTrack> {
        let removed = self.music.remove(index)?;
        self.remap_music_refs(IndexChange::Removed(index));
        self.release_files(removed.file_refs());
        debug!(index, name = %removed.name, "removed music track");
        Ok(removed)
    }

    pub fn move_music(&mut self, from: usize, to: usize) -> Result<()> {
        self.music.move_entry(from, to)?;
        self.remap_music_refs(IndexChange::Moved { from, to });
        Ok(())
    }

    fn remap_music_refs(&mut self, change: IndexChange) {
        for fighter in self.fighters.iter_mut() {
            remap_opt(&mut fighter.victory_theme, change);
        }
        for stage in self.stages.iter_mut() {
            remap_list(&mut stage.playlist, change);
        }
    }

    // Sound groups

    pub fn add_sound_group(&mut self, group: SoundGroup) -> Result<usize> {
        let index = self.sound_groups.push(group)?;
        debug!(index, "added sound group");
        Ok(index)
    }

    pub fn remove_sound_group(&mut self, index: usize) -> Result<SoundGroup> {
        let removed = self.sound_groups.remove(index)?;
        self.remap_sound_refs(IndexChange::Removed(index));
        self.release_files(removed.file_refs());
        debug!(index, name = %removed.name, "removed sound group");
        Ok(removed)
    }

    pub fn move_sound_group(&mut self, from: usize, to: usize) -> Result<()> {
        self.sound_groups.move_entry(from, to)?;
        self.remap_sound_refs(IndexChange::Moved { from, to });
        Ok(())
    }

    fn remap_sound_refs(&mut self, change: IndexChange) {
        for fighter in self.fighters.iter_mut() {
            remap_opt(&mut fighter.sound_bank, change);
        }
        for stage in self.stages.iter_mut() {
            remap_opt(&mut stage.sound_bank, change);
        }
    }

    // Series

    pub fn add_series(&mut self, series: Series) -> usize {
        self.series.push(series);
        self.series.len() - 1
    }

    /// Removes a series. Series are not slot-mapped, so any entry may go.
    pub fn remove_series(&mut self, index: usize) -> Result<Series> {
        if index >= self.series.len() {
            return Err(ModelError::SeriesNotFound { index });
        }
        let removed = self.series.remove(index);
        let change = IndexChange::Removed(index);
        for fighter in self.fighters.iter_mut() {
            remap_opt(&mut fighter.series, change);
        }
        for stage in self.stages.iter_mut() {
            remap_opt(&mut stage.series, change);
        }
        Ok(removed)
    }

    // Codes and patches

    pub fn add_code(&mut self, code: CodeEntry) -> Result<()> {
        if self.codes.iter().any(|c| c.name == code.name) {
            return Err(ModelError::DuplicateCode { name: code.name });
        }
        self.codes.push(code);
        Ok(())
    }

    pub fn remove_code(&mut self, name: &str) -> Result<CodeEntry> {
        let position = self
            .codes
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ModelError::CodeNotFound {
                name: name.to_string(),
            })?;
        Ok(self.codes.remove(position))
    }

    pub fn set_code_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let code = self
            .codes
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ModelError::CodeNotFound {
                name: name.to_string(),
            })?;
        code.enabled = enabled;
        Ok(())
    }

    /// Inserts or replaces a patch blob, returning the previous one.
    pub fn set_patch(&mut self, name: impl Into<String>, blob: PatchBlob) -> Option<PatchBlob> {
        self.patches.insert(name.into(), blob)
    }

    pub fn remove_patch(&mut self, name: &str) -> Result<PatchBlob> {
        self.patches
            .remove(name)
            .ok_or_else(|| ModelError::PatchNotFound {
                name: name.to_string(),
            })
    }

    // Unbaked assets

    /// Schedules `path` for a codec pass at the next export. The key is
    /// stored in normalized disc form, the same form exports list files in.
    pub fn mark_unbaked(&mut self, path: &str, kind: AssetKind) -> Result<()> {
        let key = normalize_path(path).map_err(|reason| ModelError::InvalidPath {
            path: path.to_string(),
            reason,
        })?;
        self.unbaked.insert(key, kind);
        Ok(())
    }

    /// Drops pending encodes for files that left the project with a removed
    /// entry, unless another entry still references them.
    fn release_files<'a>(&mut self, released: impl IntoIterator<Item = &'a str>) {
        if self.unbaked.is_empty() {
            return;
        }
        let released: Vec<String> = released
            .into_iter()
            .filter_map(|path| normalize_path(path).ok())
            .collect();
        let live: BTreeSet<String> = self
            .file_refs()
            .into_iter()
            .filter_map(|(_, path)| normalize_path(path).ok())
            .collect();
        for key in released {
            if !live.contains(&key) && self.unbaked.remove(&key).is_some() {
                debug!(path = %key, "dropped pending encode of released file");
            }
        }
    }

    /// Drains the unbaked set.
    pub fn take_unbaked(&mut self) -> BTreeMap<String, AssetKind> {
        std::mem::take(&mut self.unbaked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_shifts_indices_above() {
        let change = IndexChange::Removed(3);
        assert_eq!(change.apply(2), Some(2));
        assert_eq!(change.apply(3), None);
        assert_eq!(change.apply(7), Some(6));
    }

    #[test]
    fn move_is_a_permutation() {
        for (from, to) in [(2, 5), (5, 2), (3, 3)] {
            let change = IndexChange::Moved { from, to };
            let mut mapped: Vec<usize> = (0..8).filter_map(|i| change.apply(i)).collect();
            mapped.sort_unstable();
            assert_eq!(mapped, (0..8).collect::<Vec<_>>());
        }
        let change = IndexChange::Moved { from: 2, to: 5 };
        assert_eq!(change.apply(2), Some(5));
        assert_eq!(change.apply(5), Some(4));
        assert_eq!(change.apply(1), Some(1));
    }

    #[test]
    fn remap_list_drops_removed() {
        let mut playlist = vec![0, 4, 5, 9];
        remap_list(&mut playlist, IndexChange::Removed(4));
        assert_eq!(playlist, vec![0, 4, 8]);
    }
}
