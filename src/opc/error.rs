//! Error types for package I/O operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    #[error("invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("part not found: {0}")]
    PartNotFound(String),

    #[error("relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("content type not found for partname: {0}")]
    ContentTypeNotFound(String),

    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, OpcError>;
