//! Open Packaging Conventions: the ZIP-backed container format underlying
//! every OOXML document. Parts, relationships, and content types are
//! resolved here; the WML/SML/PML engines see only parsed parts and never
//! touch ZIP or relationship-file structure directly.

pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod rel;

pub use error::{OpcError, Result};
pub use package::OpcPackage;
pub use packuri::PackUri;
pub use part::Part;
pub use rel::{Relationship, Relationships};
