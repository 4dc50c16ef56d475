//! Turn aligned sheets/rows/cells into [`SmlChange`] records.

use crate::config::SmlSettings;
use crate::diff::SegmentStatus;
use crate::sml::align::{align_rows, align_sheets, SheetMatchKind};
use crate::sml::canon::{CanonCell, CanonRow, CanonSheet};
use crate::sml::change::{SmlChange, SmlChangeKind, SmlLocation};

pub fn classify_workbook(
    old: &[CanonSheet],
    new: &[CanonSheet],
    settings: &SmlSettings,
    old_defined_names: &[(String, String)],
    new_defined_names: &[(String, String)],
) -> Vec<SmlChange> {
    let alignment = align_sheets(
        old,
        new,
        settings.sheet_rename_similarity_threshold,
        settings.enable_sheet_rename_detection,
    );

    let mut changes = Vec::new();

    if settings.compare_named_ranges {
        changes.extend(classify_named_ranges(old_defined_names, new_defined_names));
    }

    for sheet in &alignment.deleted {
        changes.push(SmlChange {
            kind: SmlChangeKind::SheetDeleted,
            summary: format!("Sheet \"{}\" deleted", sheet.name),
            old_value: None,
            new_value: None,
            location: SmlLocation {
                sheet: sheet.name.clone(),
                row: None,
                cell: None,
            },
            old_sheet_name: Some(sheet.name.clone()),
            new_sheet_name: None,
        });
    }
    for sheet in &alignment.inserted {
        changes.push(SmlChange {
            kind: SmlChangeKind::SheetAdded,
            summary: format!("Sheet \"{}\" added", sheet.name),
            old_value: None,
            new_value: None,
            location: SmlLocation {
                sheet: sheet.name.clone(),
                row: None,
                cell: None,
            },
            old_sheet_name: None,
            new_sheet_name: Some(sheet.name.clone()),
        });
    }

    for (old_sheet, new_sheet, kind) in &alignment.matched {
        if *kind == SheetMatchKind::Renamed {
            changes.push(SmlChange {
                kind: SmlChangeKind::SheetRenamed,
                summary: format!("Sheet renamed: \"{}\" -> \"{}\"", old_sheet.name, new_sheet.name),
                old_value: Some(old_sheet.name.clone()),
                new_value: Some(new_sheet.name.clone()),
                location: SmlLocation {
                    sheet: new_sheet.name.clone(),
                    row: None,
                    cell: None,
                },
                old_sheet_name: Some(old_sheet.name.clone()),
                new_sheet_name: Some(new_sheet.name.clone()),
            });
        }

        if settings.enable_row_alignment {
            changes.extend(classify_sheet_rows(old_sheet, new_sheet, settings));
        } else {
            changes.extend(classify_rows_positionally(old_sheet, new_sheet, settings));
        }

        if settings.compare_merged_cells {
            changes.extend(classify_merged_cells(&new_sheet.name, old_sheet, new_sheet));
        }
        if settings.compare_hyperlinks {
            changes.extend(classify_hyperlinks(&new_sheet.name, old_sheet, new_sheet));
        }
        if settings.compare_data_validation {
            changes.extend(classify_data_validations(&new_sheet.name, old_sheet, new_sheet));
        }
    }

    changes
}

/// Named ranges live at the workbook level, so they're compared once
/// rather than per matched sheet pair.
fn classify_named_ranges(old: &[(String, String)], new: &[(String, String)]) -> Vec<SmlChange> {
    let mut changes = Vec::new();
    for (name, old_formula) in old {
        match new.iter().find(|(n, _)| n == name) {
            None => changes.push(named_range_change(name, SmlChangeKind::NamedRangeDeleted, Some(old_formula), None)),
            Some((_, new_formula)) if new_formula != old_formula => {
                changes.push(named_range_change(name, SmlChangeKind::NamedRangeChanged, Some(old_formula), Some(new_formula)));
            }
            Some(_) => {}
        }
    }
    for (name, new_formula) in new {
        if !old.iter().any(|(n, _)| n == name) {
            changes.push(named_range_change(name, SmlChangeKind::NamedRangeAdded, None, Some(new_formula)));
        }
    }
    changes
}

fn named_range_change(name: &str, kind: SmlChangeKind, old_formula: Option<&str>, new_formula: Option<&str>) -> SmlChange {
    let summary = match kind {
        SmlChangeKind::NamedRangeAdded => format!("Named range \"{name}\" added"),
        SmlChangeKind::NamedRangeDeleted => format!("Named range \"{name}\" deleted"),
        SmlChangeKind::NamedRangeChanged => format!("Named range \"{name}\" changed"),
        _ => unreachable!(),
    };
    SmlChange {
        kind,
        summary,
        old_value: old_formula.map(|s| s.to_string()),
        new_value: new_formula.map(|s| s.to_string()),
        location: SmlLocation {
            sheet: String::new(),
            row: None,
            cell: Some(name.to_string()),
        },
        old_sheet_name: None,
        new_sheet_name: None,
    }
}

fn classify_merged_cells(sheet_name: &str, old: &CanonSheet, new: &CanonSheet) -> Vec<SmlChange> {
    let mut changes = Vec::new();
    for reference in &old.merged_cells {
        if !new.merged_cells.contains(reference) {
            changes.push(range_change(sheet_name, reference, SmlChangeKind::MergedCellDeleted, "deleted"));
        }
    }
    for reference in &new.merged_cells {
        if !old.merged_cells.contains(reference) {
            changes.push(range_change(sheet_name, reference, SmlChangeKind::MergedCellAdded, "added"));
        }
    }
    changes
}

fn classify_hyperlinks(sheet_name: &str, old: &CanonSheet, new: &CanonSheet) -> Vec<SmlChange> {
    let mut changes = Vec::new();
    for (reference, target) in &old.hyperlinks {
        match new.hyperlinks.iter().find(|(r, _)| r == reference) {
            None => changes.push(hyperlink_change(sheet_name, reference, SmlChangeKind::HyperlinkDeleted, Some(target), None)),
            Some((_, new_target)) if new_target != target => {
                changes.push(hyperlink_change(sheet_name, reference, SmlChangeKind::HyperlinkChanged, Some(target), Some(new_target)));
            }
            Some(_) => {}
        }
    }
    for (reference, target) in &new.hyperlinks {
        if !old.hyperlinks.iter().any(|(r, _)| r == reference) {
            changes.push(hyperlink_change(sheet_name, reference, SmlChangeKind::HyperlinkAdded, None, Some(target)));
        }
    }
    changes
}

fn classify_data_validations(sheet_name: &str, old: &CanonSheet, new: &CanonSheet) -> Vec<SmlChange> {
    let mut changes = Vec::new();
    for (sqref, rule) in &old.data_validations {
        match new.data_validations.iter().find(|(s, _)| s == sqref) {
            None => changes.push(validation_change(sheet_name, sqref, SmlChangeKind::DataValidationDeleted, Some(rule), None)),
            Some((_, new_rule)) if new_rule != rule => {
                changes.push(validation_change(sheet_name, sqref, SmlChangeKind::DataValidationChanged, Some(rule), Some(new_rule)));
            }
            Some(_) => {}
        }
    }
    for (sqref, rule) in &new.data_validations {
        if !old.data_validations.iter().any(|(s, _)| s == sqref) {
            changes.push(validation_change(sheet_name, sqref, SmlChangeKind::DataValidationAdded, None, Some(rule)));
        }
    }
    changes
}

fn range_change(sheet_name: &str, reference: &str, kind: SmlChangeKind, verb: &str) -> SmlChange {
    SmlChange {
        kind,
        summary: format!("Merged cell {reference} {verb}"),
        old_value: None,
        new_value: None,
        location: SmlLocation {
            sheet: sheet_name.to_string(),
            row: None,
            cell: Some(reference.to_string()),
        },
        old_sheet_name: None,
        new_sheet_name: None,
    }
}

fn hyperlink_change(sheet_name: &str, reference: &str, kind: SmlChangeKind, old_target: Option<&str>, new_target: Option<&str>) -> SmlChange {
    let summary = match kind {
        SmlChangeKind::HyperlinkAdded => format!("Hyperlink added at {reference}"),
        SmlChangeKind::HyperlinkDeleted => format!("Hyperlink deleted at {reference}"),
        SmlChangeKind::HyperlinkChanged => format!("Hyperlink changed at {reference}"),
        _ => unreachable!(),
    };
    SmlChange {
        kind,
        summary,
        old_value: old_target.map(|s| s.to_string()),
        new_value: new_target.map(|s| s.to_string()),
        location: SmlLocation {
            sheet: sheet_name.to_string(),
            row: None,
            cell: Some(reference.to_string()),
        },
        old_sheet_name: None,
        new_sheet_name: None,
    }
}

fn validation_change(sheet_name: &str, sqref: &str, kind: SmlChangeKind, old_rule: Option<&str>, new_rule: Option<&str>) -> SmlChange {
    let summary = match kind {
        SmlChangeKind::DataValidationAdded => format!("Data validation added at {sqref}"),
        SmlChangeKind::DataValidationDeleted => format!("Data validation deleted at {sqref}"),
        SmlChangeKind::DataValidationChanged => format!("Data validation changed at {sqref}"),
        _ => unreachable!(),
    };
    SmlChange {
        kind,
        summary,
        old_value: old_rule.map(|s| s.to_string()),
        new_value: new_rule.map(|s| s.to_string()),
        location: SmlLocation {
            sheet: sheet_name.to_string(),
            row: None,
            cell: Some(sqref.to_string()),
        },
        old_sheet_name: None,
        new_sheet_name: None,
    }
}

fn classify_sheet_rows(old_sheet: &CanonSheet, new_sheet: &CanonSheet, settings: &SmlSettings) -> Vec<SmlChange> {
    let segments = align_rows(&old_sheet.rows, &new_sheet.rows);
    let mut changes = Vec::new();
    let mut deleted_indices = Vec::new();
    let mut inserted_indices = Vec::new();

    for seg in segments {
        match seg.status {
            SegmentStatus::Equal => {
                for (i, j) in seg.items1.clone().zip(seg.items2.clone()) {
                    changes.extend(classify_row_cells(
                        &new_sheet.name,
                        &old_sheet.rows[i],
                        &new_sheet.rows[j],
                        settings,
                    ));
                }
            }
            SegmentStatus::Deleted => deleted_indices.extend(seg.items1.clone()),
            SegmentStatus::Inserted => inserted_indices.extend(seg.items2.clone()),
        }
    }

    // A row whose content changed entirely still has the same row_index on
    // both sides, so the LCS pass (which matches on content hash) sees it as
    // an unrelated delete+insert pair. Re-pair any such leftovers that share a
    // row_index before falling back to a true add/delete: same position means
    // the row was edited, not replaced.
    for &i in &deleted_indices {
        let old_row = &old_sheet.rows[i];
        if let Some(&j) = inserted_indices.iter().find(|&&j| new_sheet.rows[j].row_index == old_row.row_index) {
            changes.extend(classify_row_cells(&new_sheet.name, old_row, &new_sheet.rows[j], settings));
        } else {
            changes.push(row_change(&old_sheet.name, old_row, SmlChangeKind::RowDeleted));
        }
    }
    let paired_new_indices: std::collections::HashSet<u32> = deleted_indices
        .iter()
        .filter_map(|&i| {
            let old_row = &old_sheet.rows[i];
            inserted_indices.iter().find(|&&j| new_sheet.rows[j].row_index == old_row.row_index).map(|_| old_row.row_index)
        })
        .collect();
    for &j in &inserted_indices {
        let new_row = &new_sheet.rows[j];
        if !paired_new_indices.contains(&new_row.row_index) {
            changes.push(row_change(&new_sheet.name, new_row, SmlChangeKind::RowAdded));
        }
    }

    changes
}

/// Fallback used when row alignment is disabled: compare rows purely by
/// index, with no insert/delete detection.
fn classify_rows_positionally(old_sheet: &CanonSheet, new_sheet: &CanonSheet, settings: &SmlSettings) -> Vec<SmlChange> {
    let mut changes = Vec::new();
    let len = old_sheet.rows.len().max(new_sheet.rows.len());
    for i in 0..len {
        match (old_sheet.rows.get(i), new_sheet.rows.get(i)) {
            (Some(o), Some(n)) => changes.extend(classify_row_cells(&new_sheet.name, o, n, settings)),
            (Some(o), None) => changes.push(row_change(&old_sheet.name, o, SmlChangeKind::RowDeleted)),
            (None, Some(n)) => changes.push(row_change(&new_sheet.name, n, SmlChangeKind::RowAdded)),
            (None, None) => {}
        }
    }
    changes
}

fn row_change(sheet_name: &str, row: &CanonRow, kind: SmlChangeKind) -> SmlChange {
    let summary = match kind {
        SmlChangeKind::RowAdded => format!("Row {} added", row.row_index),
        SmlChangeKind::RowDeleted => format!("Row {} deleted", row.row_index),
        _ => unreachable!(),
    };
    SmlChange {
        kind,
        summary,
        old_value: None,
        new_value: None,
        location: SmlLocation {
            sheet: sheet_name.to_string(),
            row: Some(row.row_index),
            cell: None,
        },
        old_sheet_name: None,
        new_sheet_name: None,
    }
}

fn classify_row_cells(sheet_name: &str, old_row: &CanonRow, new_row: &CanonRow, settings: &SmlSettings) -> Vec<SmlChange> {
    let mut changes = Vec::new();
    let max_col = old_row
        .cells
        .iter()
        .chain(new_row.cells.iter())
        .map(|c| c.column)
        .max()
        .unwrap_or(0);

    for col in 1..=max_col {
        let old_cell = old_row.cells.iter().find(|c| c.column == col);
        let new_cell = new_row.cells.iter().find(|c| c.column == col);

        match (old_cell, new_cell) {
            (None, None) => {}
            (Some(o), None) => changes.push(cell_change(sheet_name, new_row.row_index, o, SmlChangeKind::CellDeleted, Some(&o.value), None)),
            (None, Some(n)) => changes.push(cell_change(sheet_name, new_row.row_index, n, SmlChangeKind::CellAdded, None, Some(&n.value))),
            (Some(o), Some(n)) => changes.extend(diff_cell(sheet_name, new_row.row_index, o, n, settings)),
        }
    }
    changes
}

fn diff_cell(sheet_name: &str, row_index: u32, old: &CanonCell, new: &CanonCell, settings: &SmlSettings) -> Vec<SmlChange> {
    let mut changes = Vec::new();

    if settings.compare_values && !values_equal(&old.value, &new.value, settings) {
        changes.push(cell_change(sheet_name, row_index, new, SmlChangeKind::ValueChanged, Some(&old.value), Some(&new.value)));
    }
    if settings.compare_formulas && old.formula != new.formula {
        changes.push(cell_change(sheet_name, row_index, new, SmlChangeKind::FormulaChanged, Some(&old.formula), Some(&new.formula)));
    }
    if settings.compare_formatting && old.style_index != new.style_index {
        changes.push(cell_change(
            sheet_name,
            row_index,
            new,
            SmlChangeKind::FormatChanged,
            Some(&old.style_index.map(|s| s.to_string())),
            Some(&new.style_index.map(|s| s.to_string())),
        ));
    }
    changes
}

fn values_equal(old: &Option<String>, new: &Option<String>, settings: &SmlSettings) -> bool {
    match (old, new) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            if settings.numeric_tolerance > 0.0 {
                if let (Ok(a_num), Ok(b_num)) = (a.parse::<f64>(), b.parse::<f64>()) {
                    return (a_num - b_num).abs() <= settings.numeric_tolerance;
                }
            }
            if settings.case_insensitive_values {
                a.eq_ignore_ascii_case(b)
            } else {
                a == b
            }
        }
        _ => false,
    }
}

fn cell_change(
    sheet_name: &str,
    row_index: u32,
    cell: &CanonCell,
    kind: SmlChangeKind,
    old_value: Option<&Option<String>>,
    new_value: Option<&Option<String>>,
) -> SmlChange {
    let old_value = old_value.and_then(|v| v.clone());
    let new_value = new_value.and_then(|v| v.clone());
    let summary = match kind {
        SmlChangeKind::ValueChanged => format!(
            "{}: {} -> {}",
            cell.reference,
            old_value.as_deref().unwrap_or(""),
            new_value.as_deref().unwrap_or("")
        ),
        SmlChangeKind::FormulaChanged => format!("{}: formula changed", cell.reference),
        SmlChangeKind::FormatChanged => format!("{}: formatting changed", cell.reference),
        SmlChangeKind::CellAdded => format!("{}: cell added", cell.reference),
        SmlChangeKind::CellDeleted => format!("{}: cell deleted", cell.reference),
        _ => unreachable!(),
    };
    SmlChange {
        kind,
        summary,
        old_value,
        new_value,
        location: SmlLocation {
            sheet: sheet_name.to_string(),
            row: Some(row_index),
            cell: Some(cell.reference.clone()),
        },
        old_sheet_name: None,
        new_sheet_name: None,
    }
}
