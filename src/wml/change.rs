//! Per-family change record for the Word engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WmlChangeKind {
    Insertion,
    Deletion,
    Modification,
    FormatChange,
    TableRowInserted,
    TableRowDeleted,
    SectionPropertiesChanged,
}

/// Where a change happened: a flat paragraph index plus optional table
/// coordinates, matching the "paragraph index / optional table row/cell"
/// location contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WmlLocation {
    pub paragraph_index: usize,
    pub table_row: Option<usize>,
    pub table_cell: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WmlChange {
    pub kind: WmlChangeKind,
    pub summary: String,
    pub old_text: Option<String>,
    pub new_text: Option<String>,
    pub location: WmlLocation,
    pub author: String,
    pub timestamp: String,
    pub old_word_count: usize,
    pub new_word_count: usize,
    pub in_footnote: bool,
    pub in_endnote: bool,
    pub in_table: bool,
    pub in_textbox: bool,
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
