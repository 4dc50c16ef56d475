//! WML (Word) engine errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WmlError {
    #[error("main document part not found")]
    NoDocumentPart,

    #[error("document.xml has no w:body element")]
    NoBody,

    #[error("XML error: {0}")]
    Xml(String),
}

pub type Result<T> = std::result::Result<T, WmlError>;
