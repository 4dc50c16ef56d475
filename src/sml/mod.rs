//! The Excel (SpreadsheetML) comparison engine: canonicalize both workbooks'
//! sheets, align sheets (exact name, then rename detection) and rows
//! (LCS over row hashes), classify cell-level differences, and emit a
//! marked-up workbook.

pub mod align;
pub mod canon;
pub mod change;
pub mod classify;
pub mod emit;
pub mod error;

use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::SmlSettings;
use crate::opc::constants::{content_type as ct, relationship_type};
use crate::opc::{OpcPackage, PackUri};
use crate::xml::XmlNode;

pub use change::{SmlChange, SmlChangeKind, SmlLocation};
pub use error::SmlError;

use align::align_sheets;
use canon::{canonicalize_sheet, parse_defined_names, parse_shared_strings, CanonSheet};
use emit::{append_highlight_style, build_comments_part, highlight_rows, inserted_row_indices};

pub struct SmlCompareResult {
    pub document_bytes: Vec<u8>,
    pub changes: Vec<SmlChange>,
    pub insertions: usize,
    pub deletions: usize,
    pub format_changes: usize,
}

#[tracing::instrument(skip_all)]
pub fn compare_xlsx(old_bytes: &[u8], new_bytes: &[u8], settings: &SmlSettings) -> crate::error::Result<SmlCompareResult> {
    let old_pkg = OpcPackage::open(old_bytes)?;
    let mut new_pkg = OpcPackage::open(new_bytes)?;

    let old_sheets = load_sheets(&old_pkg)?;
    let new_sheets = load_sheets(&new_pkg)?;

    tracing::debug!(old_sheets = old_sheets.len(), new_sheets = new_sheets.len(), "canonicalizing sheets");

    // Each sheet canonicalizes independently, so this fans out over rayon's
    // global pool rather than walking sheets one at a time.
    let old_canon: Vec<CanonSheet> = old_sheets
        .par_iter()
        .map(|(name, xml, shared)| canonicalize_sheet(name, xml, shared))
        .collect();
    let new_canon: Vec<CanonSheet> = new_sheets
        .par_iter()
        .map(|(name, xml, shared)| canonicalize_sheet(name, xml, shared))
        .collect();

    let old_defined_names = load_defined_names(&old_pkg)?;
    let new_defined_names = load_defined_names(&new_pkg)?;

    let changes = classify::classify_workbook(&old_canon, &new_canon, settings, &old_defined_names, &new_defined_names);

    let new_sheet_parts = resolve_sheet_parts(&new_pkg)?;
    let style_index = if settings.compare_formatting {
        mark_inserted_rows(&mut new_pkg, &new_canon, &changes, &new_sheet_parts)?
    } else {
        None
    };
    let _ = style_index;

    if settings.compare_comments {
        attach_comments(&mut new_pkg, &new_canon, &changes, &new_sheet_parts, &settings.author_for_comments)?;
    }

    let document_bytes = new_pkg.save()?;

    let insertions = changes
        .iter()
        .filter(|c| matches!(c.kind, SmlChangeKind::SheetAdded | SmlChangeKind::RowAdded | SmlChangeKind::CellAdded))
        .count();
    let deletions = changes
        .iter()
        .filter(|c| matches!(c.kind, SmlChangeKind::SheetDeleted | SmlChangeKind::RowDeleted | SmlChangeKind::CellDeleted))
        .count();
    let format_changes = changes.iter().filter(|c| c.kind == SmlChangeKind::FormatChanged).count();

    Ok(SmlCompareResult {
        document_bytes,
        changes,
        insertions,
        deletions,
        format_changes,
    })
}

/// Load every sheet's (name, parsed XML, shared-string table) triple from a
/// workbook package.
fn load_sheets(pkg: &OpcPackage) -> crate::error::Result<Vec<(String, XmlNode, Vec<String>)>> {
    let (wb_uri, wb_part) = pkg.main_part().map_err(|_| SmlError::NoWorkbookPart)?;
    let wb_uri = wb_uri.clone();
    let wb_roots = crate::xml::parse(wb_part.blob())?;
    let wb_root = wb_roots.first().ok_or(SmlError::NoWorkbookPart)?;

    let shared_strings = load_shared_strings(pkg, &wb_uri)?;

    let sheets_elem = wb_root.find_by_local_name("sheets").ok_or(SmlError::NoWorkbookPart)?;
    let rels = pkg.relationships(Some(&wb_uri));

    let mut out = Vec::new();
    for sheet_node in sheets_elem.children_by_local_name("sheet") {
        let name = sheet_node.attr("name").unwrap_or_default().to_string();
        let r_id = sheet_node
            .attr("r:id")
            .or_else(|| sheet_node.attr("id"))
            .unwrap_or_default();
        let Some(rel) = rels.get(r_id) else { continue };
        let Ok(target) = rel.target_partname() else { continue };
        let Some(part) = pkg.part(&target) else { continue };
        let roots = crate::xml::parse(part.blob())?;
        let Some(root) = roots.into_iter().next() else { continue };
        out.push((name, root, shared_strings.clone()));
    }
    Ok(out)
}

fn load_shared_strings(pkg: &OpcPackage, wb_uri: &PackUri) -> crate::error::Result<Vec<String>> {
    let rels = pkg.relationships(Some(wb_uri));
    let Ok(rel) = rels.part_with_reltype(relationship_type::SHARED_STRINGS) else {
        return Ok(Vec::new());
    };
    let Ok(target) = rel.target_partname() else {
        return Ok(Vec::new());
    };
    let Some(part) = pkg.part(&target) else {
        return Ok(Vec::new());
    };
    let roots = crate::xml::parse(part.blob())?;
    Ok(roots.first().map(parse_shared_strings).unwrap_or_default())
}

/// Load the workbook-level `definedNames` table (name, formula) pairs.
fn load_defined_names(pkg: &OpcPackage) -> crate::error::Result<Vec<(String, String)>> {
    let (_, wb_part) = pkg.main_part().map_err(|_| SmlError::NoWorkbookPart)?;
    let wb_roots = crate::xml::parse(wb_part.blob())?;
    let wb_root = wb_roots.first().ok_or(SmlError::NoWorkbookPart)?;
    Ok(parse_defined_names(wb_root))
}

/// Map each sheet name to its worksheet part's [`PackUri`] in a package.
fn resolve_sheet_parts(pkg: &OpcPackage) -> crate::error::Result<HashMap<String, PackUri>> {
    let (wb_uri, wb_part) = pkg.main_part().map_err(|_| SmlError::NoWorkbookPart)?;
    let wb_uri = wb_uri.clone();
    let wb_roots = crate::xml::parse(wb_part.blob())?;
    let wb_root = wb_roots.first().ok_or(SmlError::NoWorkbookPart)?;
    let sheets_elem = wb_root.find_by_local_name("sheets").ok_or(SmlError::NoWorkbookPart)?;
    let rels = pkg.relationships(Some(&wb_uri));

    let mut out = HashMap::new();
    for sheet_node in sheets_elem.children_by_local_name("sheet") {
        let name = sheet_node.attr("name").unwrap_or_default().to_string();
        let r_id = sheet_node
            .attr("r:id")
            .or_else(|| sheet_node.attr("id"))
            .unwrap_or_default();
        if let Some(rel) = rels.get(r_id) {
            if let Ok(target) = rel.target_partname() {
                out.insert(name, target);
            }
        }
    }
    Ok(out)
}

fn mark_inserted_rows(
    new_pkg: &mut OpcPackage,
    new_canon: &[CanonSheet],
    changes: &[SmlChange],
    sheet_parts: &HashMap<String, PackUri>,
) -> crate::error::Result<Option<u32>> {
    let inserted_any = changes.iter().any(|c| c.kind == SmlChangeKind::RowAdded);
    if !inserted_any {
        return Ok(None);
    }

    let (wb_uri, wb_part) = new_pkg.main_part().map_err(|_| SmlError::NoWorkbookPart)?;
    let wb_uri = wb_uri.clone();
    let rels = new_pkg.relationships(Some(&wb_uri)).clone();
    let _ = wb_part;
    let Ok(styles_rel) = rels.part_with_reltype(relationship_type::STYLES) else {
        return Ok(None);
    };
    let styles_uri = styles_rel.target_partname().map_err(|e| SmlError::Xml(e))?;
    let Some(styles_part) = new_pkg.part(&styles_uri) else {
        return Ok(None);
    };
    let styles_roots = crate::xml::parse(styles_part.blob())?;
    let (new_styles_roots, style_index) = append_highlight_style(&styles_roots, "FFC6EFCE");
    let styles_xml = crate::xml::build(&new_styles_roots)?;
    new_pkg
        .part_mut(&styles_uri)
        .ok_or(SmlError::NoWorkbookPart)?
        .set_blob(styles_xml.into_bytes());

    for sheet in new_canon {
        let rows = inserted_row_indices(&sheet.rows, changes, &sheet.name);
        if rows.is_empty() {
            continue;
        }
        let Some(sheet_uri) = sheet_parts.get(&sheet.name) else { continue };
        let Some(part) = new_pkg.part(sheet_uri) else { continue };
        let roots = crate::xml::parse(part.blob())?;
        let highlighted = highlight_rows(&roots, &rows, style_index);
        let xml = crate::xml::build(&highlighted)?;
        new_pkg.part_mut(sheet_uri).ok_or(SmlError::NoWorkbookPart)?.set_blob(xml.into_bytes());
    }

    Ok(Some(style_index))
}

fn attach_comments(
    new_pkg: &mut OpcPackage,
    new_canon: &[CanonSheet],
    changes: &[SmlChange],
    sheet_parts: &HashMap<String, PackUri>,
    author: &str,
) -> crate::error::Result<()> {
    let mut next_comment_index = 1u32;
    for sheet in new_canon {
        let sheet_changes: Vec<SmlChange> = changes.iter().filter(|c| c.location.sheet == sheet.name).cloned().collect();
        let Some(comments_xml) = build_comments_part(author, &sheet_changes) else {
            continue;
        };
        let Some(sheet_uri) = sheet_parts.get(&sheet.name) else { continue };

        let comments_uri_str = format!("/xl/comments{}.xml", next_comment_index);
        next_comment_index += 1;
        let comments_uri = PackUri::new(comments_uri_str).map_err(SmlError::Xml)?;
        new_pkg.create_part(comments_uri.clone(), ct::SML_COMMENTS, comments_xml.into_bytes());

        if let Some(part) = new_pkg.part_mut(sheet_uri) {
            part.rels_mut()
                .get_or_add(relationship_type::COMMENTS, &format!("../comments{}.xml", next_comment_index - 1), false);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn minimal_xlsx(a1_value: &str) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buf);
            let opts = SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", opts).unwrap();
            zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#).unwrap();

            zip.start_file("_rels/.rels", opts).unwrap();
            zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", opts).unwrap();
            zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#).unwrap();

            zip.start_file("xl/workbook.xml", opts).unwrap();
            zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#).unwrap();

            zip.start_file("xl/styles.xml", opts).unwrap();
            zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fills count="1"><fill><patternFill patternType="none"/></fill></fills><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#).unwrap();

            zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
            let sheet = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1"><v>{}</v></c></row></sheetData></worksheet>"#,
                a1_value
            );
            zip.write_all(sheet.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn compares_two_minimal_workbooks_and_marks_a_value_change() {
        let old = minimal_xlsx("1");
        let new = minimal_xlsx("2");
        let settings = SmlSettings::default();
        let result = compare_xlsx(&old, &new, &settings).unwrap();
        assert!(result.changes.iter().any(|c| c.kind == SmlChangeKind::ValueChanged));
        assert!(OpcPackage::open(&result.document_bytes).is_ok());
    }

    #[test]
    fn identical_workbooks_produce_no_changes() {
        let bytes = minimal_xlsx("1");
        let settings = SmlSettings::default();
        let result = compare_xlsx(&bytes, &bytes, &settings).unwrap();
        assert!(result.changes.is_empty());
    }
}
