//! Summary counts of a workspace.

use mex_model::{Project, Roster, RosterEntry};
use serde::Serialize;

/// Entry counts of one roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RosterCounts {
    pub total: usize,
    pub vanilla: usize,
    pub extended: usize,
}

/// What a workspace holds, for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceInfo {
    pub fighters: RosterCounts,
    pub costumes: usize,
    pub stages: RosterCounts,
    pub music: RosterCounts,
    pub sound_groups: RosterCounts,
    pub series: usize,
    pub codes: usize,
    pub enabled_codes: usize,
    pub patches: usize,
    /// Assets waiting to be encoded at the next export.
    pub unbaked: usize,
    /// Paths the overlay adds, replaces or hides.
    pub overlay_entries: usize,
}

impl RosterCounts {
    fn of<T: RosterEntry>(roster: &Roster<T>) -> Self {
        Self {
            total: roster.len(),
            vanilla: roster.vanilla_count(),
            extended: roster.extended_count(),
        }
    }
}

impl WorkspaceInfo {
    #[must_use]
    pub fn collect(project: &Project, overlay_entries: usize) -> Self {
        Self {
            fighters: RosterCounts::of(project.fighters()),
            costumes: project.fighters().iter().map(|f| f.costumes.len()).sum(),
            stages: RosterCounts::of(project.stages()),
            music: RosterCounts::of(project.music()),
            sound_groups: RosterCounts::of(project.sound_groups()),
            series: project.series().len(),
            codes: project.codes().len(),
            enabled_codes: project.codes().iter().filter(|c| c.enabled).count(),
            patches: project.patches().len(),
            unbaked: project.unbaked().len(),
            overlay_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mex_model::{CodeEntry, Fighter, vanilla::seed_project};

    #[test]
    fn counts_extended_entries_separately() {
        let mut project = seed_project().unwrap();
        project.add_fighter(Fighter::new("Wolf", "PlWf.dat")).unwrap();
        let mut code = CodeEntry::new("Off", "04003100 60000000");
        code.enabled = false;
        project.add_code(code).unwrap();

        let info = WorkspaceInfo::collect(&project, 2);

        assert_eq!(info.fighters.total, info.fighters.vanilla + 1);
        assert_eq!(info.fighters.extended, 1);
        assert_eq!(info.stages.extended, 0);
        assert_eq!((info.codes, info.enabled_codes), (1, 0));
        assert_eq!(info.overlay_entries, 2);
    }
}
