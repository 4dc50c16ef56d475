//! The single call boundary external callers (and the CLI) go through:
//! detect the family from a shared file extension, dispatch to the matching
//! engine, and return a uniform `{document, changes, counters}` shape.

use crate::config::{PmlSettings, SmlSettings, WmlSettings};
use crate::error::{CompareError, Result};
use crate::pml::{PmlChange, PmlCompareResult};
use crate::sml::{SmlChange, SmlCompareResult};
use crate::wml::{WmlChange, WmlCompareResult};

/// Which OOXML family a pair of inputs belongs to, keyed off file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Word,
    Excel,
    PowerPoint,
}

impl Family {
    /// Resolves a family from a lowercase, dot-less extension (`docx`, `xlsx`, `pptx`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(Family::Word),
            "xlsx" => Some(Family::Excel),
            "pptx" => Some(Family::PowerPoint),
            _ => None,
        }
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            Family::Word => "docx",
            Family::Excel => "xlsx",
            Family::PowerPoint => "pptx",
        }
    }
}

/// Per-family settings, so callers that don't care about family-specific
/// knobs can still go through a single `compare` entry point.
#[derive(Debug, Clone)]
pub enum CompareSettings {
    Word(WmlSettings),
    Excel(SmlSettings),
    PowerPoint(PmlSettings),
}

impl CompareSettings {
    pub fn family(&self) -> Family {
        match self {
            CompareSettings::Word(_) => Family::Word,
            CompareSettings::Excel(_) => Family::Excel,
            CompareSettings::PowerPoint(_) => Family::PowerPoint,
        }
    }
}

/// Change records, uniform across families by boxing each family's own kind.
#[derive(Debug, Clone)]
pub enum Change {
    Word(WmlChange),
    Excel(SmlChange),
    PowerPoint(PmlChange),
}

/// Counters uniform across families. Families that don't track a given
/// counter (moved slides have no SML/WML equivalent) leave it at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub insertions: usize,
    pub deletions: usize,
    pub moved: usize,
    pub format_changes: usize,
}

/// `{document, changes, counters}` returned by [`compare`].
pub struct CompareResult {
    pub document: Vec<u8>,
    pub changes: Vec<Change>,
    pub counters: Counters,
}

/// Compares two documents of the same family, dispatching on `settings`.
///
/// Returns [`CompareError::UnsupportedFileType`] if either input fails to
/// open as an OOXML package at all; family mismatches are caught earlier, by
/// [`resolve_family`], since bytes alone don't carry a declared extension.
#[tracing::instrument(skip_all, fields(family = ?settings.family()))]
pub fn compare(old_bytes: &[u8], new_bytes: &[u8], settings: &CompareSettings) -> Result<CompareResult> {
    match settings {
        CompareSettings::Word(s) => {
            let WmlCompareResult { document_bytes, changes, insertions, deletions, format_changes, .. } = crate::wml::compare_docx(old_bytes, new_bytes, s)?;
            Ok(CompareResult {
                document: document_bytes,
                changes: changes.into_iter().map(Change::Word).collect(),
                counters: Counters { insertions, deletions, moved: 0, format_changes },
            })
        }
        CompareSettings::Excel(s) => {
            let SmlCompareResult { document_bytes, changes, insertions, deletions, format_changes } = crate::sml::compare_xlsx(old_bytes, new_bytes, s)?;
            Ok(CompareResult {
                document: document_bytes,
                changes: changes.into_iter().map(Change::Excel).collect(),
                counters: Counters { insertions, deletions, moved: 0, format_changes },
            })
        }
        CompareSettings::PowerPoint(s) => {
            let PmlCompareResult { document_bytes, changes, insertions, deletions, moved, modifications } = crate::pml::compare_pptx(old_bytes, new_bytes, s)?;
            Ok(CompareResult {
                document: document_bytes,
                changes: changes.into_iter().map(Change::PowerPoint).collect(),
                counters: Counters { insertions, deletions, moved, format_changes: modifications },
            })
        }
    }
}

/// Resolves the shared family of two file paths by extension, rejecting
/// mismatched or unrecognized extensions up front.
pub fn resolve_family(old_path: &std::path::Path, new_path: &std::path::Path) -> Result<Family> {
    let old_ext = old_path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let new_ext = new_path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    let old_family = Family::from_extension(old_ext).ok_or_else(|| CompareError::UnsupportedFileType(old_path.display().to_string()))?;
    let new_family = Family::from_extension(new_ext).ok_or_else(|| CompareError::UnsupportedFileType(new_path.display().to_string()))?;

    if old_family != new_family {
        return Err(CompareError::UnsupportedFileType(format!(
            "mismatched file types: {} vs {}",
            old_path.display(),
            new_path.display()
        )));
    }
    Ok(old_family)
}
