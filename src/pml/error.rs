//! PML (PowerPoint) engine errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PmlError {
    #[error("presentation part not found")]
    NoPresentationPart,

    #[error("slide part not found: {0}")]
    NoSlidePart(String),

    #[error("XML error: {0}")]
    Xml(String),
}

pub type Result<T> = std::result::Result<T, PmlError>;
