//! Fixed-width ID tables written into the image.
//!
//! ```text
//! "MXDT" u16 version  u16 table count
//! per table:
//!   u8 roster kind  u8 id width  u16 zero  u32 slot count  u32 vanilla count
//!   slot count rows, indexed by external ID:
//!     u16 internal index (FFFF = empty)  u8 flags  u8 zero
//!     u16 sound bank  u16 music  u16 partner   (external IDs, FFFF = none)
//! ```
//!
//! Cross references are written as external IDs, since that is how the
//! executable addresses them. `music` is a fighter's victory theme or the
//! first track of a stage's playlist.

use mex_model::{
    ExternalId, IdWidth, OverrideRule, Project, Roster, RosterEntry, RosterKind, overrides_for,
};

use crate::error::{BuildError, Result};

pub const TABLES_MAGIC: [u8; 4] = *b"MXDT";
pub const TABLES_VERSION: u16 = 1;

const EMPTY: u16 = 0xFFFF;
const ROW_SIZE: usize = 10;

pub const FLAG_EXTENDED: u8 = 0x01;
pub const FLAG_FOLLOWER: u8 = 0x02;
pub const FLAG_TRANSFORM: u8 = 0x04;

/// One slot of a decoded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableRow {
    pub internal: Option<u16>,
    pub flags: u8,
    pub sound_bank: Option<ExternalId>,
    pub music: Option<ExternalId>,
    pub partner: Option<ExternalId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTable {
    pub kind: RosterKind,
    pub width: IdWidth,
    pub vanilla_count: u32,
    /// Indexed by external ID.
    pub rows: Vec<TableRow>,
}

impl IdTable {
    /// Number of occupied slots.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.rows.iter().filter(|r| r.internal.is_some()).count()
    }

    #[must_use]
    pub fn row(&self, external: ExternalId) -> Option<&TableRow> {
        self.rows.get(usize::from(external.0))
    }
}

/// Decoded ID tables file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTables {
    pub tables: Vec<IdTable>,
}

impl IdTables {
    #[must_use]
    pub fn table(&self, kind: RosterKind) -> Option<&IdTable> {
        self.tables.iter().find(|t| t.kind == kind)
    }
}

fn external_of<T: RosterEntry>(roster: &Roster<T>, internal: usize) -> Result<ExternalId> {
    Roster::<T>::layout()
        .checked_to_external_id(internal, roster.len())
        .ok_or_else(|| BuildError::InvalidTables {
            reason: format!(
                "{} {internal} has no slot at roster size {}",
                T::KIND,
                roster.len()
            ),
        })
}

fn encode_ref(id: Option<ExternalId>) -> u16 {
    id.map_or(EMPTY, |id| id.0)
}

fn table_rows<T: RosterEntry>(
    roster: &Roster<T>,
    refs: impl Fn(&T) -> Result<[Option<ExternalId>; 2]>,
) -> Result<Vec<TableRow>> {
    let layout = Roster::<T>::layout();
    let mut rows: Vec<TableRow> = Vec::new();
    for (internal, entry) in roster.iter().enumerate() {
        let external = external_of(roster, internal)?;
        let slot = usize::from(external.0);
        if rows.len() <= slot {
            rows.resize(slot + 1, TableRow::default());
        }

        let mut flags = 0;
        if internal >= layout.vanilla_count {
            flags |= FLAG_EXTENDED;
        }
        let mut partner = None;
        for rule in overrides_for(T::KIND, external) {
            match rule.rule {
                OverrideRule::Follower { .. } => flags |= FLAG_FOLLOWER,
                OverrideRule::TransformPartner { partner: id } => {
                    flags |= FLAG_TRANSFORM;
                    partner = Some(ExternalId(id));
                }
            }
        }

        let [sound_bank, music] = refs(entry)?;
        rows[slot] = TableRow {
            internal: Some(u16::try_from(internal).map_err(|_| BuildError::InvalidTables {
                reason: format!("{} {internal} does not fit a table row", T::KIND),
            })?),
            flags,
            sound_bank,
            music,
            partner,
        };
    }
    Ok(rows)
}

fn push_table(out: &mut Vec<u8>, kind: RosterKind, vanilla_count: usize, rows: &[TableRow]) {
    let width = match mex_model::SlotLayout::for_kind(kind).width {
        IdWidth::Byte => 1u8,
        IdWidth::Half => 2u8,
    };
    out.push(kind.tag());
    out.push(width);
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&u32::try_from(rows.len()).unwrap_or(u32::MAX).to_be_bytes());
    out.extend_from_slice(&u32::try_from(vanilla_count).unwrap_or(u32::MAX).to_be_bytes());
    for row in rows {
        out.extend_from_slice(&row.internal.unwrap_or(EMPTY).to_be_bytes());
        out.push(row.flags);
        out.push(0);
        out.extend_from_slice(&encode_ref(row.sound_bank).to_be_bytes());
        out.extend_from_slice(&encode_ref(row.music).to_be_bytes());
        out.extend_from_slice(&encode_ref(row.partner).to_be_bytes());
    }
}

/// Encodes the tables for the project's current slot mapping.
///
/// A roster entry or cross reference with no slot at the current roster
/// size is an error, never an empty row.
pub fn write_id_tables(project: &Project) -> Result<Vec<u8>> {
    let sound_groups = project.sound_groups();
    let music = project.music();
    let sound_bank = |i: Option<usize>| i.map(|i| external_of(sound_groups, i)).transpose();
    let track = |i: Option<usize>| i.map(|i| external_of(music, i)).transpose();

    let fighters = table_rows(project.fighters(), |f| {
        Ok([sound_bank(f.sound_bank)?, track(f.victory_theme)?])
    })?;
    let stages = table_rows(project.stages(), |s| {
        Ok([sound_bank(s.sound_bank)?, track(s.playlist.first().copied())?])
    })?;
    let tracks = table_rows(music, |_| Ok([None, None]))?;
    let groups = table_rows(sound_groups, |_| Ok([None, None]))?;

    let mut out = Vec::new();
    out.extend_from_slice(&TABLES_MAGIC);
    out.extend_from_slice(&TABLES_VERSION.to_be_bytes());
    out.extend_from_slice(&4u16.to_be_bytes());
    push_table(&mut out, RosterKind::Fighter, project.fighters().vanilla_count(), &fighters);
    push_table(&mut out, RosterKind::Stage, project.stages().vanilla_count(), &stages);
    push_table(&mut out, RosterKind::Music, music.vanilla_count(), &tracks);
    push_table(&mut out, RosterKind::SoundGroup, sound_groups.vanilla_count(), &groups);
    Ok(out)
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.at + N;
        let slice = self.bytes.get(self.at..end).ok_or_else(|| BuildError::InvalidTables {
            reason: format!("truncated at byte {}", self.at),
        })?;
        self.at = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take()?))
    }

    fn id(&mut self) -> Result<Option<ExternalId>> {
        let value = self.u16()?;
        Ok((value != EMPTY).then_some(ExternalId(value)))
    }
}

/// Decodes a tables file.
pub fn read_id_tables(bytes: &[u8]) -> Result<IdTables> {
    let mut reader = Reader { bytes, at: 0 };
    if reader.take::<4>()? != TABLES_MAGIC {
        return Err(BuildError::InvalidTables {
            reason: "bad magic".to_string(),
        });
    }
    let version = reader.u16()?;
    if version != TABLES_VERSION {
        return Err(BuildError::InvalidTables {
            reason: format!("unsupported version {version}"),
        });
    }

    let count = reader.u16()?;
    let mut tables = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let [tag, width, _, _] = reader.take::<4>()?;
        let kind = RosterKind::from_tag(tag).ok_or_else(|| BuildError::InvalidTables {
            reason: format!("unknown roster kind {tag}"),
        })?;
        let width = match width {
            1 => IdWidth::Byte,
            2 => IdWidth::Half,
            other => {
                return Err(BuildError::InvalidTables {
                    reason: format!("unsupported id width {other}"),
                });
            }
        };
        let slots = reader.u32()? as usize;
        let vanilla_count = reader.u32()?;
        if bytes.len().saturating_sub(reader.at) < slots.saturating_mul(ROW_SIZE) {
            return Err(BuildError::InvalidTables {
                reason: format!("{kind} table claims {slots} rows"),
            });
        }

        let mut rows = Vec::with_capacity(slots);
        for _ in 0..slots {
            let internal = reader.u16()?;
            let [flags, _] = reader.take::<2>()?;
            rows.push(TableRow {
                internal: (internal != EMPTY).then_some(internal),
                flags,
                sound_bank: reader.id()?,
                music: reader.id()?,
                partner: reader.id()?,
            });
        }
        tables.push(IdTable {
            kind,
            width,
            vanilla_count,
            rows,
        });
    }
    Ok(IdTables { tables })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mex_model::vanilla::{self, seed_project};
    use mex_model::{Fighter, MusicTrack};

    #[test]
    fn vanilla_tables_are_identity_mapped() {
        let project = seed_project().unwrap();
        let tables = read_id_tables(&write_id_tables(&project).unwrap()).unwrap();
        let fighters = tables.table(RosterKind::Fighter).unwrap();
        assert_eq!(fighters.entry_count(), vanilla::FIGHTERS.len());
        for (i, row) in fighters.rows.iter().enumerate() {
            assert_eq!(row.internal, Some(i as u16));
            assert_eq!(row.flags & FLAG_EXTENDED, 0);
        }
        assert_eq!(tables.tables.len(), 4);
    }

    #[test]
    fn overrides_are_flagged() {
        let project = seed_project().unwrap();
        let tables = read_id_tables(&write_id_tables(&project).unwrap()).unwrap();
        let fighters = tables.table(RosterKind::Fighter).unwrap();
        assert_ne!(fighters.row(ExternalId(0x0E)).unwrap().flags & FLAG_FOLLOWER, 0);
        let zelda = fighters.row(ExternalId(0x12)).unwrap();
        assert_ne!(zelda.flags & FLAG_TRANSFORM, 0);
        assert_eq!(zelda.partner, Some(ExternalId(0x13)));
    }

    #[test]
    fn extended_entries_use_external_references() {
        let mut project = seed_project().unwrap();
        let track = project.add_music(MusicTrack::new("Theme", "audio/theme.hps")).unwrap();
        let mut wolf = Fighter::new("Wolf", "PlWf.dat");
        wolf.victory_theme = Some(track);
        wolf.sound_bank = Some(3);
        let internal = project.add_fighter(wolf).unwrap();

        let tables = read_id_tables(&write_id_tables(&project).unwrap()).unwrap();
        let fighters = tables.table(RosterKind::Fighter).unwrap();
        let external = project.fighters().external_id(internal);
        let row = fighters.row(external).unwrap();
        assert_eq!(row.internal, Some(internal as u16));
        assert_ne!(row.flags & FLAG_EXTENDED, 0);
        assert_eq!(row.music, Some(project.music().external_id(track)));
        assert_eq!(row.sound_bank, Some(ExternalId(3)));
    }

    #[test]
    fn dangling_references_fail_instead_of_vanishing() {
        let mut project = seed_project().unwrap();
        let internal = project.add_fighter(Fighter::new("Wolf", "PlWf.dat")).unwrap();
        let mut value = serde_json::to_value(&project).unwrap();
        value["fighters"][internal]["sound_bank"] = serde_json::json!(5000);
        let broken: Project = serde_json::from_value(value).unwrap();

        let err = write_id_tables(&broken).unwrap_err();
        assert!(
            matches!(err, BuildError::InvalidTables { ref reason } if reason.contains("sound group 5000"))
        );
    }

    #[test]
    fn truncated_tables_are_rejected() {
        let bytes = write_id_tables(&seed_project().unwrap()).unwrap();
        assert!(matches!(
            read_id_tables(&bytes[..bytes.len() - 1]),
            Err(BuildError::InvalidTables { .. })
        ));
        assert!(read_id_tables(b"NOPE").is_err());
    }
}
