//! Expansion results: the flattened config and the nested layout

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ExpansionError;

/// Flattened list of primitive resources, ready for deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub resources: Vec<Value>,
}

/// Top of the layout tree, one node per top-level resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub resources: Vec<LayoutNode>,
}

/// One resource in the layout tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Only set for template nodes whose resource declared `properties`
    pub properties: Option<Value>,
    /// Present only for templates that expanded into at least one child
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<LayoutNode>>,
}

impl LayoutNode {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            properties: None,
            resources: None,
        }
    }

    /// Append a child, creating the `resources` list on first use
    pub fn push_child(&mut self, child: LayoutNode) {
        self.resources.get_or_insert_with(Vec::new).push(child);
    }

    pub fn is_template(&self) -> bool {
        self.resources.is_some()
    }
}

/// The contribution of a single resource and everything beneath it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedResource {
    pub config: Config,
    pub layout: LayoutNode,
}

/// A fully expanded document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub config: Config,
    pub layout: Layout,
}

impl Expansion {
    /// Merge one top-level resource's result into the document
    pub fn push(&mut self, processed: ProcessedResource) {
        self.config.resources.extend(processed.config.resources);
        self.layout.resources.push(processed.layout);
    }

    pub fn to_yaml(&self) -> Result<String, ExpansionError> {
        serde_yaml::to_string(self).map_err(|e| ExpansionError::Serialize {
            message: e.to_string(),
        })
    }
}

/// What an expansion produced
#[derive(Debug, Clone, PartialEq)]
pub enum ExpandOutput {
    /// The document was empty
    Empty,
    /// The document was plain text and is returned verbatim
    Passthrough(String),
    Expanded(Expansion),
}

impl ExpandOutput {
    /// Serialize to the text handed back to callers
    pub fn to_yaml(&self) -> Result<String, ExpansionError> {
        match self {
            Self::Empty => Ok(String::new()),
            Self::Passthrough(text) => Ok(text.clone()),
            Self::Expanded(expansion) => expansion.to_yaml(),
        }
    }

    /// The expansion, if the document held resources
    pub fn expansion(&self) -> Option<&Expansion> {
        match self {
            Self::Expanded(expansion) => Some(expansion),
            _ => None,
        }
    }
}
