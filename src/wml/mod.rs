//! The Word (WordprocessingML) comparison engine: tokenize both documents'
//! bodies (plus footnotes/endnotes), correlate with the LCS kernel, classify
//! the result into change records, and emit a tracked-revision document.

pub mod change;
pub mod classify;
pub mod correlate;
pub mod error;
pub mod normalize;
pub mod token;
pub mod tokenize;

use crate::config::WmlSettings;
use crate::opc::constants::relationship_type;
use crate::opc::{OpcPackage, PackUri};
use crate::xml::XmlNode;

pub use change::{WmlChange, WmlChangeKind, WmlLocation};
pub use error::WmlError;

use normalize::{accept_revisions, strip_drawing_ids};
use token::Token;

/// Full result of comparing two `.docx` packages.
pub struct WmlCompareResult {
    pub document_bytes: Vec<u8>,
    pub changes: Vec<WmlChange>,
    pub insertions: usize,
    pub deletions: usize,
    pub format_changes: usize,
    pub revision_count: u32,
}

#[tracing::instrument(skip_all)]
pub fn compare_docx(old_bytes: &[u8], new_bytes: &[u8], settings: &WmlSettings) -> crate::error::Result<WmlCompareResult> {
    let old_pkg = OpcPackage::open(old_bytes)?;
    let mut new_pkg = OpcPackage::open(new_bytes)?;

    let (old_doc_uri, old_doc_part) = old_pkg.main_part().map_err(|_| WmlError::NoDocumentPart)?;
    let (new_doc_uri, new_doc_part) = new_pkg.main_part().map_err(|_| WmlError::NoDocumentPart)?;
    let old_doc_uri = old_doc_uri.clone();
    let new_doc_uri = new_doc_uri.clone();

    let old_doc_roots = parse_normalized(old_doc_part.blob())?;
    let new_doc_roots = parse_normalized(new_doc_part.blob())?;

    let old_body = find_body(&old_doc_roots).ok_or(WmlError::NoBody)?;
    let new_body = find_body(&new_doc_roots).ok_or(WmlError::NoBody)?;

    let mut old_tokens = tokenize::tokenize_body(old_body, settings);
    let mut new_tokens = tokenize::tokenize_body(new_body, settings);

    tracing::debug!(old_tokens = old_tokens.len(), new_tokens = new_tokens.len(), "tokenized document bodies");

    let mut old_para_counter = old_tokens.last().map(|t| t.para_index + 1).unwrap_or(0);
    let mut new_para_counter = new_tokens.last().map(|t| t.para_index + 1).unwrap_or(0);

    old_tokens.extend(tokenize_notes_part(&old_pkg, &old_doc_uri, relationship_type::FOOTNOTES, "footnote", &mut old_para_counter, true, false, settings)?);
    old_tokens.extend(tokenize_notes_part(&old_pkg, &old_doc_uri, relationship_type::ENDNOTES, "endnote", &mut old_para_counter, false, true, settings)?);
    new_tokens.extend(tokenize_notes_part(&new_pkg, &new_doc_uri, relationship_type::FOOTNOTES, "footnote", &mut new_para_counter, true, false, settings)?);
    new_tokens.extend(tokenize_notes_part(&new_pkg, &new_doc_uri, relationship_type::ENDNOTES, "endnote", &mut new_para_counter, false, true, settings)?);

    let segments = correlate::correlate(&old_tokens, &new_tokens, settings.detail_threshold, settings.match_threshold);
    let edits = classify::classify_edits(&segments, &old_tokens, &new_tokens);
    let mut changes = classify::build_changes(&edits, &old_tokens, &new_tokens, settings);
    if settings.compare_section_properties {
        if let Some(c) = classify::section_properties_change(old_body, new_body, &settings.author_for_revisions, &settings.effective_date()) {
            changes.push(c);
        }
    }

    let (body_children, revision_count) = crate::wml::emit_body(&edits, &old_tokens, &new_tokens, settings);
    let new_document_roots = crate::wml::rebuild_document(&new_doc_roots, body_children);
    let document_xml = crate::xml::build(&new_document_roots)?;

    new_pkg
        .part_mut(&new_doc_uri)
        .ok_or(WmlError::NoDocumentPart)?
        .set_blob(document_xml.into_bytes());

    let document_bytes = new_pkg.save()?;

    let insertions = changes.iter().filter(|c| matches!(c.kind, WmlChangeKind::Insertion | WmlChangeKind::TableRowInserted)).count();
    let deletions = changes.iter().filter(|c| matches!(c.kind, WmlChangeKind::Deletion | WmlChangeKind::TableRowDeleted)).count();
    let format_changes = changes
        .iter()
        .filter(|c| matches!(c.kind, WmlChangeKind::FormatChange | WmlChangeKind::SectionPropertiesChanged))
        .count();

    Ok(WmlCompareResult {
        document_bytes,
        changes,
        insertions,
        deletions,
        format_changes,
        revision_count,
    })
}

fn parse_normalized(blob: &[u8]) -> crate::error::Result<Vec<XmlNode>> {
    let nodes = crate::xml::parse(blob)?;
    Ok(nodes
        .iter()
        .filter_map(accept_revisions)
        .map(|n| strip_drawing_ids(&n))
        .collect())
}

fn find_body(roots: &[XmlNode]) -> Option<&XmlNode> {
    roots.iter().find_map(|r| r.find_by_local_name("body"))
}

#[allow(clippy::too_many_arguments)]
fn tokenize_notes_part(
    pkg: &OpcPackage,
    doc_uri: &PackUri,
    reltype: &str,
    note_local_name: &str,
    para_counter: &mut usize,
    in_footnote: bool,
    in_endnote: bool,
    settings: &WmlSettings,
) -> crate::error::Result<Vec<Token>> {
    let rels = pkg.relationships(Some(doc_uri));
    let Ok(rel) = rels.part_with_reltype(reltype) else {
        return Ok(Vec::new());
    };
    let Ok(target) = rel.target_partname() else {
        return Ok(Vec::new());
    };
    let Some(part) = pkg.part(&target) else {
        return Ok(Vec::new());
    };

    let roots = parse_normalized(part.blob())?;
    let note_plural = format!("{note_local_name}s");
    let root = roots
        .iter()
        .find_map(|r| r.find_by_local_name(&note_plural));

    Ok(match root {
        Some(root) => tokenize::tokenize_notes(root, note_local_name, para_counter, in_footnote, in_endnote, settings),
        None => Vec::new(),
    })
}

// Re-exported so `mod.rs` can drive emission without a public `emit` module
// name clash with the classify/correlate naming already used above.
mod emit;
use emit::{emit_body, rebuild_document};
