//! oxcompare - structural comparison and revision marking for OOXML documents
//!
//! Compares two Office Open XML packages of the same family (.docx, .xlsx,
//! .pptx) and produces a structured list of changes plus a third package:
//! the new document, visually marked up with the differences (tracked
//! revisions for Word, highlighted cells for Excel, colored overlays and
//! banners for PowerPoint).
//!
//! # Example
//!
//! ```no_run
//! use oxcompare::api::{compare, CompareSettings};
//! use oxcompare::config::WmlSettings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let old_bytes = std::fs::read("old.docx")?;
//! let new_bytes = std::fs::read("new.docx")?;
//!
//! let settings = CompareSettings::Word(WmlSettings::default());
//! let result = compare(&old_bytes, &new_bytes, &settings)?;
//!
//! std::fs::write("comparison-result.docx", &result.document)?;
//! println!("{} insertions, {} deletions", result.counters.insertions, result.counters.deletions);
//! # Ok(())
//! # }
//! ```
//!
//! Each family engine can also be called directly ([`wml::compare_docx`],
//! [`sml::compare_xlsx`], [`pml::compare_pptx`]) when the caller already
//! knows the family and doesn't want to go through the [`api::Change`]
//! wrapper enum.

pub mod api;
pub mod config;
pub mod diff;
pub mod error;
pub mod hash;
pub mod opc;
pub mod pml;
pub mod sml;
pub mod wml;
pub mod xml;

pub use api::{compare, Change, CompareResult, CompareSettings, Counters, Family};
pub use error::CompareError;
