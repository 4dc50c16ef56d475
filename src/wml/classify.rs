//! Turn correlated segments into the richer per-run edit list emit.rs
//! renders, and into the change records the engine returns to callers.

use std::ops::Range;

use crate::config::WmlSettings;
use crate::diff::{Segment, SegmentStatus};
use crate::wml::change::{word_count, WmlChange, WmlChangeKind, WmlLocation};
use crate::wml::token::{Token, TokenKind};
use crate::xml::{build_fragment, local_name, XmlNode};

/// A run-level edit, richer than the generic [`Segment`]: adjacent
/// delete/insert pairs that turn out to be pure formatting changes or a
/// reference inserted mid-word are folded into their own variants so
/// emit.rs never has to re-derive them.
#[derive(Debug, Clone)]
pub enum WmlEdit {
    Equal { old: Range<usize>, new: Range<usize> },
    Deleted { old: Range<usize> },
    Inserted { new: Range<usize> },
    /// Same word text on both sides, different run properties: emitted as
    /// `w:rPrChange`, not a delete+insert pair.
    FormatChanged { old: Range<usize>, new: Range<usize> },
    /// A footnote/endnote reference was inserted in the middle of a word
    /// that a naive diff would otherwise show as deleted+reinserted.
    /// `new` covers the reference plus the reassembled word fragments;
    /// the content itself is reported as unchanged.
    ReferenceInsertedMidWord { new: Range<usize> },
}

pub fn classify_edits(segments: &[Segment], old: &[Token], new: &[Token]) -> Vec<WmlEdit> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < segments.len() {
        let seg = &segments[i];
        match seg.status {
            SegmentStatus::Equal => {
                out.push(WmlEdit::Equal {
                    old: seg.items1.clone(),
                    new: seg.items2.clone(),
                });
                i += 1;
            }
            SegmentStatus::Deleted => {
                if let Some(next) = segments.get(i + 1) {
                    if next.status == SegmentStatus::Inserted {
                        let old_text = word_text(old, seg.items1.clone());
                        let new_text = word_text(new, next.items2.clone());
                        if old_text == new_text && !old_text.is_empty() {
                            if has_reference(new, next.items2.clone()) {
                                out.push(WmlEdit::ReferenceInsertedMidWord {
                                    new: next.items2.clone(),
                                });
                            } else {
                                out.push(WmlEdit::FormatChanged {
                                    old: seg.items1.clone(),
                                    new: next.items2.clone(),
                                });
                            }
                            i += 2;
                            continue;
                        }
                    }
                }
                out.push(WmlEdit::Deleted { old: seg.items1.clone() });
                i += 1;
            }
            SegmentStatus::Inserted => {
                out.push(WmlEdit::Inserted { new: seg.items2.clone() });
                i += 1;
            }
        }
    }
    out
}

fn word_text(tokens: &[Token], range: Range<usize>) -> String {
    tokens[range]
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Word))
        .map(|t| t.text.as_str())
        .collect()
}

fn has_reference(tokens: &[Token], range: Range<usize>) -> bool {
    tokens[range]
        .iter()
        .any(|t| matches!(t.kind, TokenKind::FootnoteRef | TokenKind::EndnoteRef))
}

pub fn build_changes(edits: &[WmlEdit], old: &[Token], new: &[Token], settings: &WmlSettings) -> Vec<WmlChange> {
    let author = settings.author_for_revisions.clone();
    let timestamp = settings.effective_date();
    let mut changes = Vec::new();
    let mut i = 0;

    while i < edits.len() {
        match &edits[i] {
            WmlEdit::Equal { .. } | WmlEdit::ReferenceInsertedMidWord { .. } => {}
            WmlEdit::FormatChanged { old: old_r, new: new_r } => {
                let (in_footnote, in_endnote, in_textbox) = context_for(new, new_r.clone());
                changes.push(change_record(
                    WmlChangeKind::FormatChange,
                    format!("Formatting changed: \"{}\"", display_text(new, new_r.clone())),
                    Some(display_text(old, old_r.clone())),
                    Some(display_text(new, new_r.clone())),
                    location_for(new, new_r.clone()),
                    in_footnote,
                    in_endnote,
                    in_textbox,
                    &author,
                    &timestamp,
                ));
            }
            WmlEdit::Deleted { old: old_r } => {
                if let Some(WmlEdit::Inserted { new: new_r }) = edits.get(i + 1) {
                    let (in_footnote, in_endnote, in_textbox) = context_for(new, new_r.clone());
                    changes.push(change_record(
                        WmlChangeKind::Modification,
                        format!(
                            "\"{}\" changed to \"{}\"",
                            display_text(old, old_r.clone()),
                            display_text(new, new_r.clone())
                        ),
                        Some(display_text(old, old_r.clone())),
                        Some(display_text(new, new_r.clone())),
                        location_for(new, new_r.clone()),
                        in_footnote,
                        in_endnote,
                        in_textbox,
                        &author,
                        &timestamp,
                    ));
                    i += 2;
                    continue;
                }
                let kind = if is_table_row(old, old_r.clone()) {
                    WmlChangeKind::TableRowDeleted
                } else {
                    WmlChangeKind::Deletion
                };
                let (in_footnote, in_endnote, in_textbox) = context_for(old, old_r.clone());
                changes.push(change_record(
                    kind,
                    format!("Deleted: \"{}\"", display_text(old, old_r.clone())),
                    Some(display_text(old, old_r.clone())),
                    None,
                    location_for(old, old_r.clone()),
                    in_footnote,
                    in_endnote,
                    in_textbox,
                    &author,
                    &timestamp,
                ));
            }
            WmlEdit::Inserted { new: new_r } => {
                let kind = if is_table_row(new, new_r.clone()) {
                    WmlChangeKind::TableRowInserted
                } else {
                    WmlChangeKind::Insertion
                };
                let (in_footnote, in_endnote, in_textbox) = context_for(new, new_r.clone());
                changes.push(change_record(
                    kind,
                    format!("Inserted: \"{}\"", display_text(new, new_r.clone())),
                    None,
                    Some(display_text(new, new_r.clone())),
                    location_for(new, new_r.clone()),
                    in_footnote,
                    in_endnote,
                    in_textbox,
                    &author,
                    &timestamp,
                ));
            }
        }
        i += 1;
    }

    changes
}

/// Compares the trailing `w:sectPr` of each body, independent of the
/// run-level token diff; section properties carry no text of their own.
pub fn section_properties_change(old_body: &XmlNode, new_body: &XmlNode, author: &str, timestamp: &str) -> Option<WmlChange> {
    let old_xml = section_properties_xml(old_body);
    let new_xml = section_properties_xml(new_body);
    if old_xml == new_xml {
        return None;
    }
    Some(WmlChange {
        kind: WmlChangeKind::SectionPropertiesChanged,
        summary: "Section properties changed".to_string(),
        old_text: None,
        new_text: None,
        location: WmlLocation::default(),
        author: author.to_string(),
        timestamp: timestamp.to_string(),
        old_word_count: 0,
        new_word_count: 0,
        in_footnote: false,
        in_endnote: false,
        in_table: false,
        in_textbox: false,
    })
}

fn section_properties_xml(body: &XmlNode) -> String {
    body.children()
        .iter()
        .rev()
        .find(|c| c.name().map(local_name) == Some("sectPr"))
        .and_then(|n| build_fragment(std::slice::from_ref(n)).ok())
        .unwrap_or_default()
}

fn is_table_row(tokens: &[Token], range: Range<usize>) -> bool {
    tokens[range]
        .first()
        .map(|t| matches!(t.kind, TokenKind::TableRowMark))
        .unwrap_or(false)
}

fn display_text(tokens: &[Token], range: Range<usize>) -> String {
    let mut out = String::new();
    for t in &tokens[range] {
        match &t.kind {
            TokenKind::Word => out.push_str(&t.text),
            TokenKind::Structural { kind } => out.push_str(&format!("[{kind}]")),
            TokenKind::FootnoteRef => out.push_str("[footnote]"),
            TokenKind::EndnoteRef => out.push_str("[endnote]"),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn location_for(tokens: &[Token], range: Range<usize>) -> WmlLocation {
    let token = tokens.get(range.start).or_else(|| tokens.last());
    match token {
        Some(t) => WmlLocation {
            paragraph_index: t.para_index,
            table_row: t.table_row,
            table_cell: t.table_cell,
        },
        None => WmlLocation::default(),
    }
}

/// The footnote/endnote/textbox context of the token a range starts at,
/// same lookup strategy as [`location_for`].
fn context_for(tokens: &[Token], range: Range<usize>) -> (bool, bool, bool) {
    let token = tokens.get(range.start).or_else(|| tokens.last());
    match token {
        Some(t) => (t.in_footnote, t.in_endnote, t.in_textbox),
        None => (false, false, false),
    }
}

#[allow(clippy::too_many_arguments)]
fn change_record(
    kind: WmlChangeKind,
    summary: String,
    old_text: Option<String>,
    new_text: Option<String>,
    location: WmlLocation,
    in_footnote: bool,
    in_endnote: bool,
    in_textbox: bool,
    author: &str,
    timestamp: &str,
) -> WmlChange {
    let old_word_count = old_text.as_deref().map(word_count).unwrap_or(0);
    let new_word_count = new_text.as_deref().map(word_count).unwrap_or(0);
    WmlChange {
        kind,
        summary,
        in_footnote,
        in_endnote,
        in_table: location.table_row.is_some(),
        in_textbox,
        old_text,
        new_text,
        location,
        author: author.to_string(),
        timestamp: timestamp.to_string(),
        old_word_count,
        new_word_count,
    }
}
