//! Comparison units for the WML engine: word tokens and the special
//! terminal markers listed in the data model (paragraph mark, table-row
//! mark, cell mark, footnote/endnote reference, structural token).

use crate::diff::Hashable;
use crate::hash::{combine, hash_string};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    ParagraphMark,
    TableRowMark,
    CellMark,
    FootnoteRef,
    EndnoteRef,
    /// An opaque structural unit (drawing/math/textbox/picture). Carries its
    /// own content hash so it is never flattened into synthetic text.
    Structural { kind: &'static str },
}

/// One comparison unit in the WML token stream.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Display text for `Word` tokens; raw serialized XML for everything
    /// that must be re-emitted verbatim (structural tokens, reference
    /// markers).
    pub text: String,
    /// Serialized `w:rPr`/equivalent run properties, hashed per token so
    /// format-only changes can be detected and re-emitted per run.
    pub rpr_xml: Option<String>,
    pub hash: String,
    pub para_index: usize,
    pub in_footnote: bool,
    pub in_endnote: bool,
    pub in_table: bool,
    pub in_textbox: bool,
    pub table_row: Option<usize>,
    pub table_cell: Option<usize>,
}

impl Hashable for Token {
    fn hash(&self) -> &str {
        &self.hash
    }
}

impl Token {
    pub fn is_anchor_skippable(&self) -> bool {
        match &self.kind {
            TokenKind::ParagraphMark | TokenKind::TableRowMark | TokenKind::CellMark => true,
            TokenKind::Structural { .. } => true,
            TokenKind::Word => self.text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn word(text: String, para_index: usize, rpr_xml: Option<String>, ctx: &Context) -> Self {
        let rpr_hash = rpr_xml.as_deref().map(hash_string).unwrap_or_default();
        let hash = combine(["word", &text, &rpr_hash]);
        Token {
            kind: TokenKind::Word,
            text,
            rpr_xml,
            hash,
            para_index,
            in_footnote: ctx.in_footnote,
            in_endnote: ctx.in_endnote,
            in_table: ctx.in_table,
            in_textbox: ctx.in_textbox,
            table_row: ctx.table_row,
            table_cell: ctx.table_cell,
        }
    }

    /// `ppr_xml` is the paragraph's serialized `w:pPr` (if any), carried
    /// through so emit.rs can re-attach it and so a fully inserted/deleted
    /// paragraph still knows its own formatting.
    pub fn paragraph_mark(para_index: usize, ppr_xml: Option<String>, ctx: &Context) -> Self {
        let ppr_hash = ppr_xml.as_deref().map(hash_string).unwrap_or_default();
        Token {
            kind: TokenKind::ParagraphMark,
            text: String::new(),
            rpr_xml: ppr_xml,
            hash: combine(["pmark", &ppr_hash]),
            para_index,
            in_footnote: ctx.in_footnote,
            in_endnote: ctx.in_endnote,
            in_table: ctx.in_table,
            in_textbox: ctx.in_textbox,
            table_row: ctx.table_row,
            table_cell: ctx.table_cell,
        }
    }

    pub fn table_row_mark(para_index: usize, row_hash: &str, ctx: &Context) -> Self {
        Token {
            kind: TokenKind::TableRowMark,
            text: String::new(),
            rpr_xml: None,
            hash: combine(["rowmark", row_hash]),
            para_index,
            in_footnote: ctx.in_footnote,
            in_endnote: ctx.in_endnote,
            in_table: true,
            in_textbox: ctx.in_textbox,
            table_row: ctx.table_row,
            table_cell: None,
        }
    }

    pub fn cell_mark(para_index: usize, ctx: &Context) -> Self {
        Token {
            kind: TokenKind::CellMark,
            text: String::new(),
            rpr_xml: None,
            hash: combine(["cellmark"]),
            para_index,
            in_footnote: ctx.in_footnote,
            in_endnote: ctx.in_endnote,
            in_table: true,
            in_textbox: ctx.in_textbox,
            table_row: ctx.table_row,
            table_cell: ctx.table_cell,
        }
    }

    pub fn structural(kind: &'static str, xml: String, para_index: usize, ctx: &Context) -> Self {
        let content_hash = hash_string(&xml);
        Token {
            kind: TokenKind::Structural { kind },
            text: xml,
            rpr_xml: None,
            hash: combine(["struct", kind, &content_hash]),
            para_index,
            in_footnote: ctx.in_footnote,
            in_endnote: ctx.in_endnote,
            in_table: ctx.in_table,
            in_textbox: ctx.in_textbox,
            table_row: ctx.table_row,
            table_cell: ctx.table_cell,
        }
    }

    /// Drops run properties from the matching hash while leaving `rpr_xml`
    /// intact for re-serialization; used when run-property comparison is
    /// switched off so the LCS kernel never sees a format-only difference.
    pub fn exclude_run_properties_from_hash(mut self) -> Self {
        if matches!(self.kind, TokenKind::Word) {
            self.hash = combine(["word", &self.text]);
        }
        self
    }

    /// Same idea as [`Token::exclude_run_properties_from_hash`], for the
    /// paragraph mark's `w:pPr`.
    pub fn exclude_paragraph_properties_from_hash(mut self) -> Self {
        if matches!(self.kind, TokenKind::ParagraphMark) {
            self.hash = combine(["pmark"]);
        }
        self
    }

    pub fn footnote_ref(id: String, para_index: usize, ctx: &Context) -> Self {
        Token {
            kind: TokenKind::FootnoteRef,
            text: id,
            rpr_xml: None,
            hash: combine(["fnref"]),
            para_index,
            in_footnote: ctx.in_footnote,
            in_endnote: ctx.in_endnote,
            in_table: ctx.in_table,
            in_textbox: ctx.in_textbox,
            table_row: ctx.table_row,
            table_cell: ctx.table_cell,
        }
    }

    pub fn endnote_ref(id: String, para_index: usize, ctx: &Context) -> Self {
        Token {
            kind: TokenKind::EndnoteRef,
            text: id,
            rpr_xml: None,
            hash: combine(["enref"]),
            para_index,
            in_footnote: ctx.in_footnote,
            in_endnote: ctx.in_endnote,
            in_table: ctx.in_table,
            in_textbox: ctx.in_textbox,
            table_row: ctx.table_row,
            table_cell: ctx.table_cell,
        }
    }
}

/// Structural location context threaded through tokenization.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub in_footnote: bool,
    pub in_endnote: bool,
    pub in_table: bool,
    pub in_textbox: bool,
    pub table_row: Option<usize>,
    pub table_cell: Option<usize>,
}
