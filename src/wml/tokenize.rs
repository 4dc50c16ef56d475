//! Decompose a normalized `w:body` into the flat token stream the LCS
//! kernel operates on.

use crate::config::WmlSettings;
use crate::hash::hash_string;
use crate::wml::token::{Context, Token};
use crate::xml::node::local_name;
use crate::xml::{build_fragment, XmlNode};

pub fn tokenize_body(body: &XmlNode, settings: &WmlSettings) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut para_index = 0usize;
    let ctx = Context::default();
    for child in body.children() {
        tokenize_block(child, &mut tokens, &mut para_index, &ctx, settings);
    }
    tokens
}

/// Tokenize a single part's worth of footnote/endnote paragraphs (each
/// `w:footnote`/`w:endnote` element's own `w:p` children), continuing the
/// running paragraph-index counter so locations stay document-unique.
pub fn tokenize_notes(
    root: &XmlNode,
    local_note_name: &str,
    para_index: &mut usize,
    in_footnote: bool,
    in_endnote: bool,
    settings: &WmlSettings,
) -> Vec<Token> {
    let mut tokens = Vec::new();
    for note in root.children_by_local_name(local_note_name) {
        // Separator/continuation notes carry no author content worth diffing.
        let note_type = note.attr("type").unwrap_or("");
        if note_type == "separator" || note_type == "continuationSeparator" {
            continue;
        }
        let mut ctx = Context::default();
        ctx.in_footnote = in_footnote;
        ctx.in_endnote = in_endnote;
        for child in note.children() {
            tokenize_block(child, &mut tokens, para_index, &ctx, settings);
        }
    }
    tokens
}

fn tokenize_block(node: &XmlNode, tokens: &mut Vec<Token>, para_index: &mut usize, ctx: &Context, settings: &WmlSettings) {
    match node.name().map(local_name) {
        Some("p") => tokenize_paragraph(node, tokens, para_index, ctx, settings),
        Some("tbl") => tokenize_table(node, tokens, para_index, ctx, settings),
        Some("sdt") => {
            // Structured document tag: diff its content as if unwrapped.
            if let Some(content) = node.find_by_local_name("sdtContent") {
                for child in content.children() {
                    tokenize_block(child, tokens, para_index, ctx, settings);
                }
            }
        }
        _ => {}
    }
}

fn tokenize_table(tbl: &XmlNode, tokens: &mut Vec<Token>, para_index: &mut usize, ctx: &Context, settings: &WmlSettings) {
    let mut table_ctx = ctx.clone();
    table_ctx.in_table = true;
    for (row_i, row) in tbl.children_by_local_name("tr").into_iter().enumerate() {
        let row_hash = hash_string(&build_fragment(std::slice::from_ref(row)).unwrap_or_default());
        let mut row_ctx = table_ctx.clone();
        row_ctx.table_row = Some(row_i);
        tokens.push(Token::table_row_mark(*para_index, &row_hash, &row_ctx));

        for (cell_i, cell) in row.children_by_local_name("tc").into_iter().enumerate() {
            let mut cell_ctx = row_ctx.clone();
            cell_ctx.table_cell = Some(cell_i);
            tokens.push(Token::cell_mark(*para_index, &cell_ctx));
            for child in cell.children() {
                tokenize_block(child, tokens, para_index, &cell_ctx, settings);
            }
        }
    }
}

fn tokenize_paragraph(p: &XmlNode, tokens: &mut Vec<Token>, para_index: &mut usize, ctx: &Context, settings: &WmlSettings) {
    let idx = *para_index;
    let ppr_xml = p
        .children_by_local_name("pPr")
        .first()
        .and_then(|n| build_fragment(std::slice::from_ref(n)).ok());

    for child in p.children() {
        match child.name().map(local_name) {
            Some("r") => tokenize_run(child, tokens, idx, ctx, settings),
            Some("hyperlink") | Some("smartTag") => {
                for run in child.children_by_local_name("r") {
                    tokenize_run(run, tokens, idx, ctx, settings);
                }
            }
            _ => {}
        }
    }

    let mut mark = Token::paragraph_mark(idx, ppr_xml, ctx);
    if !settings.compare_paragraph_properties {
        mark = mark.exclude_paragraph_properties_from_hash();
    }
    tokens.push(mark);
    *para_index += 1;
}

fn tokenize_run(r: &XmlNode, tokens: &mut Vec<Token>, para_index: usize, ctx: &Context, settings: &WmlSettings) {
    let rpr_xml = r
        .children_by_local_name("rPr")
        .first()
        .and_then(|n| build_fragment(std::slice::from_ref(n)).ok());

    let make_word = |piece: String| {
        let tok = Token::word(piece, para_index, rpr_xml.clone(), ctx);
        if !settings.compare_run_properties {
            tok.exclude_run_properties_from_hash()
        } else {
            tok
        }
    };

    for child in r.children() {
        let local = match child.name() {
            Some(n) => local_name(n),
            None => continue,
        };
        match local {
            "t" => {
                let text = child.text_content();
                for piece in split_preserving_whitespace(&text) {
                    tokens.push(make_word(piece));
                }
            }
            "tab" => tokens.push(make_word("\t".to_string())),
            "br" | "cr" => tokens.push(make_word("\n".to_string())),
            "drawing" => {
                let xml = build_fragment(std::slice::from_ref(child)).unwrap_or_default();
                tokens.push(Token::structural("drawing", xml, para_index, ctx));
            }
            "object" => {
                let xml = build_fragment(std::slice::from_ref(child)).unwrap_or_default();
                tokens.push(Token::structural("object", xml, para_index, ctx));
            }
            "pict" => {
                if let Some(txbx) = child.find_by_local_name("txbxContent") {
                    let mut tb_ctx = ctx.clone();
                    tb_ctx.in_textbox = true;
                    // Textbox paragraphs are numbered from the same point but
                    // advance their own counter so they don't disturb the
                    // enclosing paragraph's index.
                    let mut local_idx = para_index;
                    for grandchild in txbx.children() {
                        tokenize_block(grandchild, tokens, &mut local_idx, &tb_ctx, settings);
                    }
                } else {
                    let xml = build_fragment(std::slice::from_ref(child)).unwrap_or_default();
                    tokens.push(Token::structural("picture", xml, para_index, ctx));
                }
            }
            "footnoteReference" => {
                let id = child.attr("id").unwrap_or_default().to_string();
                tokens.push(Token::footnote_ref(id, para_index, ctx));
            }
            "endnoteReference" => {
                let id = child.attr("id").unwrap_or_default().to_string();
                tokens.push(Token::endnote_ref(id, para_index, ctx));
            }
            "fldChar" | "instrText" => {
                let xml = build_fragment(std::slice::from_ref(child)).unwrap_or_default();
                tokens.push(Token::structural("field", xml, para_index, ctx));
            }
            _ => {}
        }
    }
}

/// Split into alternating word / whitespace-run substrings so concatenating
/// every piece back together reconstructs the original text exactly.
fn split_preserving_whitespace(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_is_ws: Option<bool> = None;

    for ch in text.chars() {
        let is_ws = ch.is_whitespace();
        match current_is_ws {
            Some(prev) if prev == is_ws => current.push(ch),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                current.push(ch);
                current_is_ws = Some(is_ws);
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wml::token::TokenKind;
    use crate::xml::parse;

    #[test]
    fn tokenizes_words_and_paragraph_mark() {
        let xml = r#"<w:body><w:p><w:r><w:t>The quick brown fox</w:t></w:r></w:p></w:body>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let tokens = tokenize_body(&nodes[0], &WmlSettings::default());
        let words: Vec<&str> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Word) && !t.text.trim().is_empty())
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(words, vec!["The", "quick", "brown", "fox"]);
        assert!(matches!(tokens.last().unwrap().kind, TokenKind::ParagraphMark));
    }

    #[test]
    fn drawing_becomes_opaque_structural_token() {
        let xml = r#"<w:body><w:p><w:r><w:drawing><wp:inline><a:graphic/></wp:inline></w:drawing></w:r></w:p></w:body>"#;
        let nodes = parse(xml.as_bytes()).unwrap();
        let tokens = tokenize_body(&nodes[0], &WmlSettings::default());
        assert!(tokens
            .iter()
            .any(|t| matches!(t.kind, TokenKind::Structural { kind: "drawing" })));
    }

    #[test]
    fn split_preserving_whitespace_reconstructs_original() {
        let text = "  hello   world ";
        let pieces = split_preserving_whitespace(text);
        assert_eq!(pieces.concat(), text);
    }
}
