//! Import map: the in-memory artifact namespace for one expansion

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Suffix naming the schema artifact that belongs to a template
pub const SCHEMA_SUFFIX: &str = ".schema";

/// Immutable map from artifact name (a logical path) to its contents
///
/// Cloning is cheap; clones share the same storage. Templates see exactly
/// these artifacts and nothing from the real filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    artifacts: Arc<BTreeMap<String, String>>,
}

impl ImportMap {
    /// Create a new empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from alternating name/content values, as passed on a command line
    ///
    /// Returns the position of the dangling name if the list has odd length.
    pub fn from_pairs<I>(values: I) -> Result<Self, usize>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut artifacts = BTreeMap::new();
        let mut values = values.into_iter().enumerate();
        while let Some((idx, name)) = values.next() {
            let Some((_, content)) = values.next() else {
                return Err(idx);
            };
            artifacts.insert(name.into(), content.into());
        }
        Ok(Self {
            artifacts: Arc::new(artifacts),
        })
    }

    /// Get an artifact's contents by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).map(|s| s.as_str())
    }

    /// Check if an artifact exists
    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Get all artifact names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.artifacts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Name of the schema artifact for a template type, if one was imported
    pub fn schema_for(&self, template_type: &str) -> Option<String> {
        let name = format!("{}{}", template_type, SCHEMA_SUFFIX);
        self.contains(&name).then_some(name)
    }

    /// The underlying map, for handing to template runtimes
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.artifacts
    }
}

impl<K, V> FromIterator<(K, V)> for ImportMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            artifacts: Arc::new(
                iter.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for ImportMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.artifacts.as_ref().serialize(serializer)
    }
}

impl From<BTreeMap<String, String>> for ImportMap {
    fn from(artifacts: BTreeMap<String, String>) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }
}
