//! Rewrite the new-side document body with tracked-revision markup from a
//! classified edit list.

use crate::config::WmlSettings;
use crate::wml::classify::WmlEdit;
use crate::wml::token::{Token, TokenKind};
use crate::xml::node::local_name;
use crate::xml::XmlNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderStatus {
    Equal,
    Deleted,
    Inserted,
}

struct RenderToken<'a> {
    token: &'a Token,
    status: RenderStatus,
    /// Set only for a matched-but-reformatted word: the old run's `w:rPr`.
    old_rpr: Option<String>,
}

struct RevId(u32);

impl RevId {
    fn new() -> Self {
        RevId(0)
    }
    fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Build the full set of `w:body` children (paragraphs and tables) implied
/// by a classified edit list. Section properties are the caller's
/// responsibility: they live outside the tokenized comparison units.
pub fn emit_body(edits: &[WmlEdit], old: &[Token], new: &[Token], settings: &WmlSettings) -> (Vec<XmlNode>, u32) {
    let flat = flatten(edits, old, new);
    build_structure(&flat, settings)
}

/// Splice freshly built body children into the new-side document tree,
/// preserving whatever followed the body's tokenized paragraphs/tables
/// (in practice, the document's final `w:sectPr`).
pub fn rebuild_document(new_doc_roots: &[XmlNode], body_children: Vec<XmlNode>) -> Vec<XmlNode> {
    new_doc_roots
        .iter()
        .map(|root| splice_body(root, &body_children))
        .collect()
}

fn splice_body(node: &XmlNode, body_children: &[XmlNode]) -> XmlNode {
    match node {
        XmlNode::Element { name, attrs, children } if local_name(name) == "body" => {
            let trailing: Vec<XmlNode> = children
                .iter()
                .filter(|c| c.name().map(|n| local_name(n) == "sectPr").unwrap_or(false))
                .cloned()
                .collect();
            let mut new_children = body_children.to_vec();
            new_children.extend(trailing);
            XmlNode::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                children: new_children,
            }
        }
        XmlNode::Element { name, attrs, children } => XmlNode::Element {
            name: name.clone(),
            attrs: attrs.clone(),
            children: children.iter().map(|c| splice_body(c, body_children)).collect(),
        },
        other => other.clone(),
    }
}

fn flatten<'a>(edits: &[WmlEdit], old: &'a [Token], new: &'a [Token]) -> Vec<RenderToken<'a>> {
    let mut out = Vec::new();
    for edit in edits {
        match edit {
            WmlEdit::Equal { new: n, .. } => {
                for t in &new[n.clone()] {
                    out.push(RenderToken { token: t, status: RenderStatus::Equal, old_rpr: None });
                }
            }
            WmlEdit::Deleted { old: o } => {
                for t in &old[o.clone()] {
                    out.push(RenderToken { token: t, status: RenderStatus::Deleted, old_rpr: None });
                }
            }
            WmlEdit::Inserted { new: n } => {
                for t in &new[n.clone()] {
                    out.push(RenderToken { token: t, status: RenderStatus::Inserted, old_rpr: None });
                }
            }
            WmlEdit::FormatChanged { old: o, new: n } => {
                let old_tokens = &old[o.clone()];
                for (idx, t) in new[n.clone()].iter().enumerate() {
                    let old_rpr = old_tokens.get(idx).and_then(|ot| ot.rpr_xml.clone());
                    out.push(RenderToken { token: t, status: RenderStatus::Equal, old_rpr });
                }
            }
            WmlEdit::ReferenceInsertedMidWord { new: n } => {
                for t in &new[n.clone()] {
                    let status = if matches!(t.kind, TokenKind::FootnoteRef | TokenKind::EndnoteRef) {
                        RenderStatus::Inserted
                    } else {
                        RenderStatus::Equal
                    };
                    out.push(RenderToken { token: t, status, old_rpr: None });
                }
            }
        }
    }
    out
}

struct TableCtx {
    rows: Vec<XmlNode>,
    current_row_cells: Vec<XmlNode>,
    current_cell_paragraphs: Vec<XmlNode>,
    row_status: Option<RenderStatus>,
}

impl TableCtx {
    fn new() -> Self {
        TableCtx {
            rows: Vec::new(),
            current_row_cells: Vec::new(),
            current_cell_paragraphs: Vec::new(),
            row_status: None,
        }
    }

    fn close_cell(&mut self) {
        if !self.current_cell_paragraphs.is_empty() {
            let cell = XmlNode::Element {
                name: "w:tc".to_string(),
                attrs: Vec::new(),
                children: std::mem::take(&mut self.current_cell_paragraphs),
            };
            self.current_row_cells.push(cell);
        }
    }

    fn close_row(&mut self, settings: &WmlSettings, rev_id: &mut RevId) {
        self.close_cell();
        if !self.current_row_cells.is_empty() {
            let mut tr_children = Vec::new();
            if let Some(status) = self.row_status {
                if status != RenderStatus::Equal {
                    let tag = if status == RenderStatus::Deleted { "w:del" } else { "w:ins" };
                    let marker = revision_marker(tag, settings, rev_id);
                    tr_children.push(elem("w:trPr", vec![]).with_child(marker));
                }
            }
            tr_children.append(&mut self.current_row_cells);
            self.rows.push(XmlNode::Element {
                name: "w:tr".to_string(),
                attrs: Vec::new(),
                children: tr_children,
            });
        }
        self.row_status = None;
    }

    fn finish(mut self, settings: &WmlSettings, rev_id: &mut RevId) -> XmlNode {
        self.close_row(settings, rev_id);
        XmlNode::Element {
            name: "w:tbl".to_string(),
            attrs: Vec::new(),
            children: self.rows,
        }
    }
}

fn build_structure(tokens: &[RenderToken], settings: &WmlSettings) -> (Vec<XmlNode>, u32) {
    let mut body = Vec::new();
    let mut rev_id = RevId::new();
    let mut table: Option<TableCtx> = None;
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i].token.kind {
            TokenKind::TableRowMark => {
                let status = tokens[i].status;
                let ctx = table.get_or_insert_with(TableCtx::new);
                ctx.close_row(settings, &mut rev_id);
                ctx.row_status = Some(status);
                i += 1;
            }
            TokenKind::CellMark => {
                if let Some(ctx) = table.as_mut() {
                    ctx.close_cell();
                }
                i += 1;
            }
            _ => {
                let start = i;
                while i < tokens.len()
                    && !matches!(tokens[i].token.kind, TokenKind::ParagraphMark)
                    && !matches!(tokens[i].token.kind, TokenKind::TableRowMark | TokenKind::CellMark)
                {
                    i += 1;
                }
                let mark = tokens.get(i).filter(|t| matches!(t.token.kind, TokenKind::ParagraphMark));
                let paragraph = build_paragraph(&tokens[start..i], mark, settings, &mut rev_id);
                if mark.is_some() {
                    i += 1;
                }

                if let Some(ctx) = table.as_mut() {
                    ctx.current_cell_paragraphs.push(paragraph);
                } else {
                    body.push(paragraph);
                }

                let still_in_table = tokens.get(i).map(|t| t.token.in_table).unwrap_or(false);
                if table.is_some() && !still_in_table {
                    body.push(table.take().unwrap().finish(settings, &mut rev_id));
                }
            }
        }
    }

    if let Some(ctx) = table.take() {
        body.push(ctx.finish(settings, &mut rev_id));
    }

    (body, rev_id.0)
}

fn build_paragraph(
    run_tokens: &[RenderToken],
    mark: Option<&RenderToken>,
    settings: &WmlSettings,
    rev_id: &mut RevId,
) -> XmlNode {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < run_tokens.len() {
        let start = i;
        if mergeable(&run_tokens[i].token.kind) {
            let key = group_key(&run_tokens[i]);
            while i < run_tokens.len() && mergeable(&run_tokens[i].token.kind) && group_key(&run_tokens[i]) == key {
                i += 1;
            }
        } else {
            i += 1;
        }
        runs.push(build_run(&run_tokens[start..i], settings, rev_id));
    }

    let mut ppr_children: Vec<XmlNode> = mark
        .and_then(|m| m.token.rpr_xml.as_deref())
        .and_then(parse_single)
        .map(|node| node.children().to_vec())
        .unwrap_or_default();

    if let Some(m) = mark {
        if m.status == RenderStatus::Deleted {
            // Section properties carried by a deleted paragraph must be
            // stripped, or the rels their rId attributes reference become
            // orphaned once the paragraph is gone.
            ppr_children.retain(|c| c.name().map(|n| local_name(n) != "sectPr").unwrap_or(true));
        }
        if m.status != RenderStatus::Equal {
            let tag = if m.status == RenderStatus::Deleted { "w:del" } else { "w:ins" };
            let marker = revision_marker(tag, settings, rev_id);
            let rpr_pos = ppr_children.iter().position(|c| c.name().map(|n| local_name(n) == "rPr").unwrap_or(false));
            let mut rpr = match rpr_pos {
                Some(pos) => ppr_children.remove(pos),
                None => elem("w:rPr", vec![]),
            };
            if let XmlNode::Element { children, .. } = &mut rpr {
                children.push(marker);
            }
            ppr_children.push(rpr);
        }
    }

    let mut p_children = Vec::new();
    if !ppr_children.is_empty() {
        p_children.push(XmlNode::Element {
            name: "w:pPr".to_string(),
            attrs: Vec::new(),
            children: ppr_children,
        });
    }
    p_children.extend(runs);

    XmlNode::Element {
        name: "w:p".to_string(),
        attrs: Vec::new(),
        children: p_children,
    }
}

fn mergeable(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::Word)
}

fn group_key(rt: &RenderToken) -> (RenderStatus, Option<String>, Option<String>) {
    (rt.status, rt.token.rpr_xml.clone(), rt.old_rpr.clone())
}

fn build_run(run_tokens: &[RenderToken], settings: &WmlSettings, rev_id: &mut RevId) -> XmlNode {
    let first = &run_tokens[0];
    let mut run_children = Vec::new();

    let rpr_node = first.token.rpr_xml.as_deref().and_then(parse_single);
    if let Some(old_rpr_xml) = &first.old_rpr {
        let mut rpr = rpr_node.unwrap_or_else(|| elem("w:rPr", vec![]));
        let mut change = elem(
            "w:rPrChange",
            vec![
                ("w:id", rev_id.next().to_string()),
                ("w:author", settings.author_for_revisions.clone()),
                ("w:date", settings.effective_date()),
            ],
        );
        if let (XmlNode::Element { children, .. }, Some(old_node)) = (&mut change, parse_single(old_rpr_xml)) {
            children.push(old_node);
        }
        if let XmlNode::Element { children, .. } = &mut rpr {
            children.push(change);
        }
        run_children.push(rpr);
    } else if let Some(r) = rpr_node {
        run_children.push(r);
    }

    for rt in run_tokens {
        match &rt.token.kind {
            TokenKind::Word => {
                let tag = if rt.status == RenderStatus::Deleted { "w:delText" } else { "w:t" };
                run_children.push(text_elem(tag, &rt.token.text));
            }
            TokenKind::Structural { .. } => {
                if let Some(node) = parse_single(&rt.token.text) {
                    run_children.push(node);
                }
            }
            TokenKind::FootnoteRef => run_children.push(elem("w:footnoteReference", vec![("w:id", rt.token.text.clone())])),
            TokenKind::EndnoteRef => run_children.push(elem("w:endnoteReference", vec![("w:id", rt.token.text.clone())])),
            _ => {}
        }
    }

    let run = XmlNode::Element {
        name: "w:r".to_string(),
        attrs: Vec::new(),
        children: run_children,
    };

    match first.status {
        RenderStatus::Equal => run,
        RenderStatus::Deleted => wrap_revision(run, "w:del", settings, rev_id),
        RenderStatus::Inserted => wrap_revision(run, "w:ins", settings, rev_id),
    }
}

fn wrap_revision(inner: XmlNode, tag: &str, settings: &WmlSettings, rev_id: &mut RevId) -> XmlNode {
    revision_elem(tag, settings, rev_id).with_child(inner)
}

fn revision_marker(tag: &str, settings: &WmlSettings, rev_id: &mut RevId) -> XmlNode {
    revision_elem(tag, settings, rev_id)
}

fn revision_elem(tag: &str, settings: &WmlSettings, rev_id: &mut RevId) -> XmlNode {
    elem(
        tag,
        vec![
            ("w:id", rev_id.next().to_string()),
            ("w:author", settings.author_for_revisions.clone()),
            ("w:date", settings.effective_date()),
        ],
    )
}

fn elem(name: &str, attrs: Vec<(&str, String)>) -> XmlNode {
    XmlNode::Element {
        name: name.to_string(),
        attrs: attrs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        children: Vec::new(),
    }
}

fn text_elem(name: &str, text: &str) -> XmlNode {
    XmlNode::Element {
        name: name.to_string(),
        attrs: vec![("xml:space".to_string(), "preserve".to_string())],
        children: vec![XmlNode::Text(text.to_string())],
    }
}

fn parse_single(xml: &str) -> Option<XmlNode> {
    crate::xml::parse(xml.as_bytes()).ok().and_then(|mut v| if v.is_empty() { None } else { Some(v.remove(0)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wml::classify::{build_changes, classify_edits};
    use crate::wml::correlate::correlate;
    use crate::wml::token::Context;

    fn word(text: &str) -> Token {
        Token::word(text.to_string(), 0, None, &Context::default())
    }

    #[test]
    fn modification_emits_del_and_ins_runs() {
        let old = vec![word("fox"), Token::paragraph_mark(0, None, &Context::default())];
        let new = vec![word("dog"), Token::paragraph_mark(0, None, &Context::default())];
        let segments = correlate(&old, &new, 0.0, 0.0);
        let edits = classify_edits(&segments, &old, &new);
        let settings = WmlSettings::default();
        let (body, revision_count) = emit_body(&edits, &old, &new, &settings);
        let xml = crate::xml::build(&body).unwrap();
        assert!(xml.contains("w:del"));
        assert!(xml.contains("w:ins"));
        assert!(xml.contains("dog"));
        assert!(revision_count >= 2);
    }

    #[test]
    fn unchanged_text_emits_plain_runs() {
        let old = vec![word("hello"), Token::paragraph_mark(0, None, &Context::default())];
        let new = old.clone();
        let segments = correlate(&old, &new, 0.0, 0.0);
        let edits = classify_edits(&segments, &old, &new);
        let settings = WmlSettings::default();
        let changes = build_changes(&edits, &old, &new, &settings);
        assert!(changes.is_empty());
        let (body, revision_count) = emit_body(&edits, &old, &new, &settings);
        let xml = crate::xml::build(&body).unwrap();
        assert!(!xml.contains("w:ins"));
        assert!(!xml.contains("w:del"));
        assert_eq!(revision_count, 0);
    }
}
