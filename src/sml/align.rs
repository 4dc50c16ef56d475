//! Sheet alignment (exact name, then rename detection by content
//! similarity) and, within a matched sheet pair, row alignment via the
//! generic LCS kernel over row hashes.

use std::collections::HashSet;

use crate::diff::{self, Hashable, LcsSettings, Segment, SegmentStatus};
use crate::sml::canon::CanonRow;
use crate::sml::canon::CanonSheet;

impl Hashable for CanonRow {
    fn hash(&self) -> &str {
        &self.hash
    }
}

/// The outcome of aligning two workbooks' sheet lists.
pub struct SheetAlignment<'a> {
    /// (old, new) pairs that matched, by exact name or rename detection.
    pub matched: Vec<(&'a CanonSheet, &'a CanonSheet, SheetMatchKind)>,
    pub deleted: Vec<&'a CanonSheet>,
    pub inserted: Vec<&'a CanonSheet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetMatchKind {
    ExactName,
    Renamed,
}

pub fn align_sheets<'a>(old: &'a [CanonSheet], new: &'a [CanonSheet], rename_threshold: f64, enable_rename_detection: bool) -> SheetAlignment<'a> {
    let mut matched = Vec::new();
    let mut used_new: HashSet<usize> = HashSet::new();

    for old_sheet in old {
        if let Some(new_idx) = new.iter().position(|s| s.name == old_sheet.name) {
            if used_new.insert(new_idx) {
                matched.push((old_sheet, &new[new_idx], SheetMatchKind::ExactName));
            }
        }
    }

    let mut unmatched_old: Vec<&CanonSheet> = old
        .iter()
        .filter(|s| !matched.iter().any(|(o, _, _)| std::ptr::eq(*o, *s)))
        .collect();
    let unmatched_new: Vec<(usize, &CanonSheet)> = new
        .iter()
        .enumerate()
        .filter(|(i, _)| !used_new.contains(i))
        .collect();

    if enable_rename_detection {
        let mut still_unmatched_old = Vec::new();
        for old_sheet in unmatched_old.drain(..) {
            let old_sig = old_sheet.content_signature();
            let best = unmatched_new
                .iter()
                .filter(|(i, _)| !used_new.contains(i))
                .map(|(i, s)| (*i, s, row_similarity(old_sheet, s, &old_sig)))
                .filter(|(_, _, sim)| *sim >= rename_threshold)
                .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap());

            match best {
                Some((idx, new_sheet, _)) => {
                    used_new.insert(idx);
                    matched.push((old_sheet, new_sheet, SheetMatchKind::Renamed));
                }
                None => still_unmatched_old.push(old_sheet),
            }
        }
        unmatched_old = still_unmatched_old;
    }

    let inserted = unmatched_new
        .into_iter()
        .filter(|(i, _)| !used_new.contains(i))
        .map(|(_, s)| s)
        .collect();

    SheetAlignment {
        matched,
        deleted: unmatched_old,
        inserted,
    }
}

/// Row-hash-set Jaccard similarity between two sheets, ignoring row order.
fn row_similarity(old: &CanonSheet, new: &CanonSheet, _old_sig: &str) -> f64 {
    let old_hashes: HashSet<&str> = old.rows.iter().map(|r| r.hash.as_str()).collect();
    let new_hashes: HashSet<&str> = new.rows.iter().map(|r| r.hash.as_str()).collect();
    if old_hashes.is_empty() && new_hashes.is_empty() {
        return 1.0;
    }
    let intersection = old_hashes.intersection(&new_hashes).count();
    let union = old_hashes.union(&new_hashes).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Align a matched sheet pair's rows via the LCS kernel.
pub fn align_rows(old: &[CanonRow], new: &[CanonRow]) -> Vec<Segment> {
    let settings = LcsSettings {
        min_match_length: 1,
        detail_threshold: 0.0,
    };
    diff::diff(old, new, &settings, &|_: &CanonRow| false)
}

pub fn equal_row_pairs(old: &[CanonRow], new: &[CanonRow], segments: &[Segment]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for seg in segments {
        if seg.status == SegmentStatus::Equal {
            for (i, j) in seg.items1.clone().zip(seg.items2.clone()) {
                if i < old.len() && j < new.len() {
                    pairs.push((i, j));
                }
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, row_hashes: &[&str]) -> CanonSheet {
        CanonSheet {
            name: name.to_string(),
            rows: row_hashes
                .iter()
                .enumerate()
                .map(|(i, h)| CanonRow {
                    row_index: i as u32 + 1,
                    cells: Vec::new(),
                    hash: h.to_string(),
                })
                .collect(),
            merged_cells: Vec::new(),
            hyperlinks: Vec::new(),
            data_validations: Vec::new(),
        }
    }

    #[test]
    fn exact_name_match_wins_over_rename_detection() {
        let old = vec![sheet("Q1", &["a", "b"])];
        let new = vec![sheet("Q1", &["a", "b"])];
        let alignment = align_sheets(&old, &new, 0.8, true);
        assert_eq!(alignment.matched.len(), 1);
        assert_eq!(alignment.matched[0].2, SheetMatchKind::ExactName);
    }

    #[test]
    fn renamed_sheet_matched_by_content_similarity() {
        let old = vec![sheet("Q1", &["a", "b", "c"])];
        let new = vec![sheet("Q1-2024", &["a", "b", "c"])];
        let alignment = align_sheets(&old, &new, 0.8, true);
        assert_eq!(alignment.matched.len(), 1);
        assert_eq!(alignment.matched[0].2, SheetMatchKind::Renamed);
        assert!(alignment.deleted.is_empty());
        assert!(alignment.inserted.is_empty());
    }

    #[test]
    fn dissimilar_sheets_are_reported_as_added_and_deleted() {
        let old = vec![sheet("Old", &["a", "b"])];
        let new = vec![sheet("New", &["x", "y"])];
        let alignment = align_sheets(&old, &new, 0.8, true);
        assert!(alignment.matched.is_empty());
        assert_eq!(alignment.deleted.len(), 1);
        assert_eq!(alignment.inserted.len(), 1);
    }
}
