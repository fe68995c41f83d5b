//! Root documents, resources, and expansion output

pub mod output;
pub mod parse;
pub mod resource;

pub use output::{Config, ExpandOutput, Expansion, Layout, LayoutNode, ProcessedResource};
pub use parse::{parse_document, ParsedDocument};
pub use resource::{Resource, ResourceKind};
