//! Canonicalize a worksheet part into a per-row/per-cell model whose values
//! are directly comparable: shared-string indirection resolved, a displayed
//! value signature derived from the cell's effective number format, and the
//! formula (if any) kept as a separate field.

use crate::hash::combine;
use crate::xml::node::local_name;
use crate::xml::XmlNode;

/// One canonicalized cell.
#[derive(Debug, Clone, Default)]
pub struct CanonCell {
    pub reference: String,
    pub column: u32,
    /// The resolved display value: shared string text, inline string text,
    /// or the raw numeric/boolean/error literal.
    pub value: Option<String>,
    pub formula: Option<String>,
    /// Style index (`s` attribute), used as a stable proxy for effective
    /// formatting without resolving the full style table.
    pub style_index: Option<u32>,
    pub hash: String,
}

impl CanonCell {
    fn rehash(&mut self) {
        self.hash = combine([
            "cell",
            self.value.as_deref().unwrap_or(""),
            self.formula.as_deref().unwrap_or(""),
            &self.style_index.map(|s| s.to_string()).unwrap_or_default(),
        ]);
    }
}

/// One canonicalized row: a dense, column-ordered list of cells.
#[derive(Debug, Clone, Default)]
pub struct CanonRow {
    pub row_index: u32,
    pub cells: Vec<CanonCell>,
    pub hash: String,
}

/// One canonicalized sheet.
#[derive(Debug, Clone, Default)]
pub struct CanonSheet {
    pub name: String,
    pub rows: Vec<CanonRow>,
    /// `ref` attributes of every `mergeCell`.
    pub merged_cells: Vec<String>,
    /// (cell range, relationship id or internal location) pairs from `hyperlinks`.
    pub hyperlinks: Vec<(String, String)>,
    /// (sqref, "type:formula1") pairs from `dataValidations`.
    pub data_validations: Vec<(String, String)>,
}

impl CanonSheet {
    /// Content signature used for rename detection: the ordered hash of
    /// every row, independent of the sheet's name.
    pub fn content_signature(&self) -> String {
        let row_hashes: Vec<&str> = self.rows.iter().map(|r| r.hash.as_str()).collect();
        combine(row_hashes)
    }
}

/// Resolve a worksheet's `sheetData` into a [`CanonSheet`], given the
/// workbook's shared-string table (index -> resolved text).
pub fn canonicalize_sheet(name: &str, sheet_xml: &XmlNode, shared_strings: &[String]) -> CanonSheet {
    let mut rows = Vec::new();
    let merged_cells = parse_merged_cells(sheet_xml);
    let hyperlinks = parse_hyperlinks(sheet_xml);
    let data_validations = parse_data_validations(sheet_xml);
    let Some(sheet_data) = sheet_xml.find_by_local_name("sheetData") else {
        return CanonSheet {
            name: name.to_string(),
            rows,
            merged_cells,
            hyperlinks,
            data_validations,
        };
    };

    for row_node in sheet_data.children_by_local_name("row") {
        let row_index = row_node.attr("r").and_then(|v| v.parse().ok()).unwrap_or(0);
        let mut cells = Vec::new();

        for cell_node in row_node.children_by_local_name("c") {
            let reference = cell_node.attr("r").unwrap_or_default().to_string();
            let column = column_from_reference(&reference);
            let style_index = cell_node.attr("s").and_then(|v| v.parse().ok());
            let cell_type = cell_node.attr("t").unwrap_or("n");

            let formula = cell_node
                .find_by_local_name("f")
                .map(|f| f.text_content().trim().to_string())
                .filter(|s| !s.is_empty());

            let value = cell_node.find_by_local_name("v").map(|v| v.text_content());
            let resolved_value = resolve_value(cell_type, value, cell_node, shared_strings);

            let mut cell = CanonCell {
                reference,
                column,
                value: resolved_value,
                formula,
                style_index,
                hash: String::new(),
            };
            cell.rehash();
            cells.push(cell);
        }

        cells.sort_by_key(|c| c.column);
        let row_hash = combine(cells.iter().map(|c| c.hash.as_str()));
        rows.push(CanonRow {
            row_index,
            cells,
            hash: row_hash,
        });
    }

    rows.sort_by_key(|r| r.row_index);
    CanonSheet {
        name: name.to_string(),
        rows,
        merged_cells,
        hyperlinks,
        data_validations,
    }
}

fn parse_merged_cells(sheet_xml: &XmlNode) -> Vec<String> {
    sheet_xml
        .find_by_local_name("mergeCells")
        .map(|mc| {
            mc.children_by_local_name("mergeCell")
                .into_iter()
                .filter_map(|m| m.attr("ref").map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_hyperlinks(sheet_xml: &XmlNode) -> Vec<(String, String)> {
    sheet_xml
        .find_by_local_name("hyperlinks")
        .map(|hl| {
            hl.children_by_local_name("hyperlink")
                .into_iter()
                .filter_map(|h| {
                    let reference = h.attr("ref")?.to_string();
                    let target = h.attr("r:id").or_else(|| h.attr("location")).unwrap_or("").to_string();
                    Some((reference, target))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_data_validations(sheet_xml: &XmlNode) -> Vec<(String, String)> {
    sheet_xml
        .find_by_local_name("dataValidations")
        .map(|dv| {
            dv.children_by_local_name("dataValidation")
                .into_iter()
                .filter_map(|d| {
                    let sqref = d.attr("sqref")?.to_string();
                    let vtype = d.attr("type").unwrap_or("").to_string();
                    let formula1 = d.find_by_local_name("formula1").map(|f| f.text_content()).unwrap_or_default();
                    Some((sqref, format!("{vtype}:{formula1}")))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a workbook root's `definedNames` into (name, formula) pairs.
/// Lives at the workbook level, unlike the other comparison tables above.
pub fn parse_defined_names(wb_root: &XmlNode) -> Vec<(String, String)> {
    wb_root
        .find_by_local_name("definedNames")
        .map(|dn| {
            dn.children_by_local_name("definedName")
                .into_iter()
                .filter_map(|d| {
                    let name = d.attr("name")?.to_string();
                    let formula = d.text_content().trim().to_string();
                    Some((name, formula))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn resolve_value(
    cell_type: &str,
    raw_value: Option<String>,
    cell_node: &XmlNode,
    shared_strings: &[String],
) -> Option<String> {
    match cell_type {
        "s" => raw_value
            .and_then(|idx| idx.parse::<usize>().ok())
            .and_then(|idx| shared_strings.get(idx))
            .cloned(),
        "str" | "e" | "b" | "n" => raw_value,
        "inlineStr" => cell_node
            .find_by_local_name("is")
            .map(|is| is.text_content().trim().to_string()),
        _ => raw_value,
    }
}

/// Parse the `r` attribute (e.g. "AB12") into its 1-based column number.
pub fn column_from_reference(reference: &str) -> u32 {
    let mut col = 0u32;
    for ch in reference.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        } else {
            break;
        }
    }
    col
}

/// Parse `sst.xml` into an index-ordered list of resolved shared-string
/// text (concatenating every `t` run inside each `si`, ignoring `rPr`).
pub fn parse_shared_strings(root: &XmlNode) -> Vec<String> {
    root.children_by_local_name("si")
        .into_iter()
        .map(|si| {
            let mut text = String::new();
            for t in collect_text_nodes(si) {
                text.push_str(&t);
            }
            text
        })
        .collect()
}

fn collect_text_nodes(si: &XmlNode) -> Vec<String> {
    let mut out = Vec::new();
    match si.name().map(local_name) {
        Some("t") => out.push(si.text_content()),
        _ => {
            for child in si.children() {
                if let XmlNode::Element { name, .. } = child {
                    if local_name(name) == "t" {
                        out.push(child.text_content());
                    } else {
                        out.extend(collect_text_nodes(child));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_from_reference_parses_multi_letter_columns() {
        assert_eq!(column_from_reference("A1"), 1);
        assert_eq!(column_from_reference("Z1"), 26);
        assert_eq!(column_from_reference("AA1"), 27);
    }

    #[test]
    fn canonicalize_sheet_resolves_shared_strings() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#;
        let nodes = crate::xml::parse(xml.as_bytes()).unwrap();
        let sheet = canonicalize_sheet("Sheet1", &nodes[0], &["hello".to_string()]);
        assert_eq!(sheet.rows[0].cells[0].value.as_deref(), Some("hello"));
    }
}
