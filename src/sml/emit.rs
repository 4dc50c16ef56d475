//! Build a marked-up workbook: changed cells are annotated with a legacy
//! comment ("was: <old>"), inserted rows are highlighted with a fill style
//! appended to the style table. Sheet renames need no emission step: the
//! output document is the new-side package, which already carries the new
//! name — the rename is reported in the change list (classify.rs), not
//! written.
//!
//! Deleted rows/cells are reported in the change list (see classify.rs) but
//! are not spliced back into the emitted grid — reinserting a "phantom" row
//! at a stable position would require fractional row numbering the OOXML
//! row model doesn't support. This is a deliberate simplification.

use crate::sml::canon::CanonRow;
use crate::sml::change::{SmlChange, SmlChangeKind};
use crate::xml::node::local_name;
use crate::xml::XmlNode;

/// Append a solid-fill style to `styles.xml` and return its `cellXfs` index.
pub fn append_highlight_style(styles_roots: &[XmlNode], argb: &str) -> (Vec<XmlNode>, u32) {
    let mut new_xf_index = 0u32;
    let new_roots = styles_roots
        .iter()
        .map(|n| append_highlight_into(n, argb, &mut new_xf_index))
        .collect();
    (new_roots, new_xf_index)
}

fn append_highlight_into(node: &XmlNode, argb: &str, new_xf_index: &mut u32) -> XmlNode {
    match node {
        XmlNode::Element { name, attrs, children } if local_name(name) == "styleSheet" => {
            let mut new_children = Vec::with_capacity(children.len());
            let mut fill_count = 0u32;
            let mut cellxfs_count = 0u32;

            for child in children {
                if let XmlNode::Element { name: cn, .. } = child {
                    match local_name(cn) {
                        "fills" => {
                            fill_count = count_attr(child) as u32;
                        }
                        "cellXfs" => {
                            cellxfs_count = count_attr(child) as u32;
                        }
                        _ => {}
                    }
                }
            }

            let new_fill_id = fill_count;
            *new_xf_index = cellxfs_count;

            for child in children {
                match child {
                    XmlNode::Element { name: cn, attrs: ca, children: cc } if local_name(cn) == "fills" => {
                        let mut fills_children = cc.clone();
                        fills_children.push(solid_fill(argb));
                        new_children.push(XmlNode::Element {
                            name: cn.clone(),
                            attrs: set_count(ca, fill_count + 1),
                            children: fills_children,
                        });
                    }
                    XmlNode::Element { name: cn, attrs: ca, children: cc } if local_name(cn) == "cellXfs" => {
                        let mut xfs_children = cc.clone();
                        xfs_children.push(highlight_xf(new_fill_id));
                        new_children.push(XmlNode::Element {
                            name: cn.clone(),
                            attrs: set_count(ca, cellxfs_count + 1),
                            children: xfs_children,
                        });
                    }
                    other => new_children.push(other.clone()),
                }
            }

            XmlNode::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                children: new_children,
            }
        }
        XmlNode::Element { name, attrs, children } => XmlNode::Element {
            name: name.clone(),
            attrs: attrs.clone(),
            children: children.iter().map(|c| append_highlight_into(c, argb, new_xf_index)).collect(),
        },
        other => other.clone(),
    }
}

fn count_attr(node: &XmlNode) -> usize {
    node.children().len()
}

fn set_count(attrs: &[(String, String)], count: u32) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = attrs.iter().filter(|(k, _)| local_name(k) != "count").cloned().collect();
    out.push(("count".to_string(), count.to_string()));
    out
}

fn solid_fill(argb: &str) -> XmlNode {
    XmlNode::element("fill").with_child(
        XmlNode::element("patternFill")
            .with_attr("patternType", "solid")
            .with_child(XmlNode::element("fgColor").with_attr("rgb", argb))
            .with_child(XmlNode::element("bgColor").with_attr("indexed", "64")),
    )
}

fn highlight_xf(fill_id: u32) -> XmlNode {
    XmlNode::element("xf")
        .with_attr("numFmtId", "0")
        .with_attr("fontId", "0")
        .with_attr("fillId", &fill_id.to_string())
        .with_attr("borderId", "0")
        .with_attr("xfId", "0")
        .with_attr("applyFill", "1")
}

/// Overwrite the `s` attribute on every cell in the given rows with
/// `style_index` (used to highlight inserted rows).
pub fn highlight_rows(sheet_roots: &[XmlNode], row_indices: &[u32], style_index: u32) -> Vec<XmlNode> {
    sheet_roots
        .iter()
        .map(|n| highlight_into(n, row_indices, style_index))
        .collect()
}

fn highlight_into(node: &XmlNode, row_indices: &[u32], style_index: u32) -> XmlNode {
    match node {
        XmlNode::Element { name, attrs, children } if local_name(name) == "row" => {
            let r = attrs
                .iter()
                .find(|(k, _)| local_name(k) == "r")
                .and_then(|(_, v)| v.parse::<u32>().ok());
            if r.map(|r| row_indices.contains(&r)).unwrap_or(false) {
                XmlNode::Element {
                    name: name.clone(),
                    attrs: attrs.clone(),
                    children: children.iter().map(|c| set_cell_style(c, style_index)).collect(),
                }
            } else {
                XmlNode::Element {
                    name: name.clone(),
                    attrs: attrs.clone(),
                    children: children.iter().map(|c| highlight_into(c, row_indices, style_index)).collect(),
                }
            }
        }
        XmlNode::Element { name, attrs, children } => XmlNode::Element {
            name: name.clone(),
            attrs: attrs.clone(),
            children: children.iter().map(|c| highlight_into(c, row_indices, style_index)).collect(),
        },
        other => other.clone(),
    }
}

fn set_cell_style(node: &XmlNode, style_index: u32) -> XmlNode {
    match node {
        XmlNode::Element { name, attrs, children } if local_name(name) == "c" => {
            let mut new_attrs: Vec<(String, String)> = attrs.iter().filter(|(k, _)| local_name(k) != "s").cloned().collect();
            new_attrs.push(("s".to_string(), style_index.to_string()));
            XmlNode::Element {
                name: name.clone(),
                attrs: new_attrs,
                children: children.clone(),
            }
        }
        other => other.clone(),
    }
}

/// Build a legacy `comments1.xml`-style part listing one comment per
/// changed cell, "was: <old value>".
pub fn build_comments_part(author: &str, changes: &[SmlChange]) -> Option<String> {
    let entries: Vec<&SmlChange> = changes
        .iter()
        .filter(|c| {
            matches!(
                c.kind,
                SmlChangeKind::ValueChanged | SmlChangeKind::FormulaChanged | SmlChangeKind::FormatChanged
            )
        })
        .collect();
    if entries.is_empty() {
        return None;
    }

    let mut comment_list = String::new();
    for change in &entries {
        let Some(cell) = &change.location.cell else { continue };
        let was = change.old_value.as_deref().unwrap_or("(none)");
        comment_list.push_str(&format!(
            r#"<comment ref="{}" authorId="0"><text><r><t xml:space="preserve">was: {}</t></r></text></comment>"#,
            escape_xml(cell),
            escape_xml(was)
        ));
    }

    Some(format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors><author>{}</author></authors><commentList>{}</commentList></comments>"#,
        escape_xml(author),
        comment_list
    ))
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

pub fn inserted_row_indices(new_rows: &[CanonRow], changes: &[SmlChange], sheet_name: &str) -> Vec<u32> {
    changes
        .iter()
        .filter(|c| c.kind == SmlChangeKind::RowAdded && c.location.sheet == sheet_name)
        .filter_map(|c| c.location.row)
        .filter(|r| new_rows.iter().any(|row| row.row_index == *r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_comments_part_includes_was_text() {
        use crate::sml::change::{SmlChange, SmlLocation};
        let change = SmlChange {
            kind: SmlChangeKind::ValueChanged,
            summary: "A1: 1 -> 2".to_string(),
            old_value: Some("1".to_string()),
            new_value: Some("2".to_string()),
            location: SmlLocation {
                sheet: "Sheet1".to_string(),
                row: Some(1),
                cell: Some("A1".to_string()),
            },
            old_sheet_name: None,
            new_sheet_name: None,
        };
        let xml = build_comments_part("Comparer", &[change]).unwrap();
        assert!(xml.contains("was: 1"));
        assert!(xml.contains(r#"ref="A1""#));
    }

    #[test]
    fn no_changes_produces_no_comments_part() {
        assert!(build_comments_part("Comparer", &[]).is_none());
    }
}
