//! Tolerant OFX reader: repairs the malformed patterns OFX exports commonly
//! contain, then parses the result into a dynamic [`OfxNode`] tree.

pub mod node;
pub mod parser;

pub use node::{OfxBranch, OfxChild, OfxNode};
pub use parser::parse_ofx;
