//! Generic diff kernel shared by the WML, SML, and PML engines.

pub mod lcs;

pub use lcs::{diff, Hashable, LcsSettings, Segment, SegmentStatus};
