//! Namespace-aware XML parse/build model shared by every OOXML part.

pub mod node;

pub use node::{build, build_fragment, local_name, parse, XmlNode};
