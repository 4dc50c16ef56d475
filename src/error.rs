//! Error types for the comparison engine.
//!
//! Errors are layered: each subsystem (package I/O, XML parsing, per-family
//! engines) defines its own enum, and [`CompareError`] aggregates them behind
//! `#[from]` so callers at the single call boundary (see the concurrency
//! model) only ever match one type.

use thiserror::Error;

use crate::opc::error::OpcError;
use crate::sml::error::SmlError;
use crate::pml::error::PmlError;
use crate::wml::error::WmlError;

/// Top-level error returned by every `compare_*` entry point.
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    #[error("missing part: {0}")]
    MissingPart(String),

    #[error("malformed XML in part {part}: {source}")]
    MalformedXml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("diff internal error (this is a bug): {0}")]
    DiffInternal(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Opc(#[from] OpcError),

    #[error(transparent)]
    Wml(#[from] WmlError),

    #[error(transparent)]
    Sml(#[from] SmlError),

    #[error(transparent)]
    Pml(#[from] PmlError),
}

pub type Result<T> = std::result::Result<T, CompareError>;
