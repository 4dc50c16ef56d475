//! A part: a named byte stream plus content type and relationships.

use crate::opc::rel::Relationships;

#[derive(Debug, Clone)]
pub struct Part {
    content_type: String,
    blob: Vec<u8>,
    rels: Relationships,
}

impl Part {
    pub fn new(content_type: impl Into<String>, blob: Vec<u8>, base_uri: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            blob,
            rels: Relationships::new(base_uri),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }

    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// True if this part's content type marks it as XML (suffix `+xml` or `/xml`).
    pub fn is_xml(&self) -> bool {
        self.content_type.ends_with("+xml") || self.content_type.ends_with("/xml")
    }
}
