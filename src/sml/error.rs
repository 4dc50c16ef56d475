//! SML (Excel) engine errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmlError {
    #[error("workbook part not found")]
    NoWorkbookPart,

    #[error("sheet part not found for sheet {0}")]
    NoSheetPart(String),

    #[error("XML error: {0}")]
    Xml(String),
}

pub type Result<T> = std::result::Result<T, SmlError>;
