use std::path::Path;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use mex_build::ExportSummary;
use mex_workspace::{RosterCounts, WorkspaceInfo};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn count_cell(value: usize) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

fn roster_row(label: &str, counts: RosterCounts) -> Vec<Cell> {
    vec![
        Cell::new(label),
        count_cell(counts.total),
        count_cell(counts.vanilla),
        count_cell(counts.extended),
    ]
}

/// Roster table of a workspace.
#[must_use]
pub fn info_table(info: &WorkspaceInfo) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Roster"),
        header_cell("Entries"),
        header_cell("Vanilla"),
        header_cell("Extended"),
    ]);
    apply_table_style(&mut table);
    table.add_row(roster_row("Fighters", info.fighters));
    table.add_row(roster_row("Stages", info.stages));
    table.add_row(roster_row("Music", info.music));
    table.add_row(roster_row("Sound groups", info.sound_groups));
    table
}

pub fn print_info(workspace: &Path, info: &WorkspaceInfo) {
    println!("Workspace: {}", workspace.display());
    println!("{}", info_table(info));
    println!("Costumes: {}", info.costumes);
    println!("Series: {}", info.series);
    println!(
        "Codes: {} ({} enabled), patches: {}",
        info.codes, info.enabled_codes, info.patches
    );
    println!("Modified files: {}", info.overlay_entries);
    if info.unbaked > 0 {
        println!("Pending encodes: {}", info.unbaked);
    }
}

pub fn print_export_summary(summary: &ExportSummary) {
    println!("Exported {}", summary.output.display());
    println!(
        "{} files, {} bytes in {} ms",
        summary.files_written, summary.bytes_written, summary.elapsed_ms
    );
    println!(
        "Codes applied: {}",
        summary.install.applied.join(", ")
    );
    for overlap in &summary.install.overlaps {
        println!(
            "note: '{}' overwrote '{}' at {:#010X} ({} bytes)",
            overlap.later, overlap.earlier, overlap.address, overlap.len
        );
    }
}
