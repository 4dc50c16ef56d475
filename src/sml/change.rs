//! Change records the SML engine returns to callers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmlChangeKind {
    SheetAdded,
    SheetDeleted,
    SheetRenamed,
    RowAdded,
    RowDeleted,
    ValueChanged,
    FormulaChanged,
    FormatChanged,
    CellAdded,
    CellDeleted,
    NamedRangeAdded,
    NamedRangeDeleted,
    NamedRangeChanged,
    MergedCellAdded,
    MergedCellDeleted,
    HyperlinkAdded,
    HyperlinkDeleted,
    HyperlinkChanged,
    DataValidationAdded,
    DataValidationDeleted,
    DataValidationChanged,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmlLocation {
    pub sheet: String,
    pub row: Option<u32>,
    pub cell: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmlChange {
    pub kind: SmlChangeKind,
    pub summary: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub location: SmlLocation,
    /// Populated only for `SheetRenamed`.
    pub old_sheet_name: Option<String>,
    pub new_sheet_name: Option<String>,
}
