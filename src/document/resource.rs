//! Typed view over a resource mapping

use serde_yaml::Value;

use crate::error::ExpansionError;
use crate::template::{ImportMap, TemplateKind};

/// How a resource is handled by the processor, decided once per resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Passed through to the config as-is
    Primitive,
    /// Expanded by the matching template strategy
    Template(TemplateKind),
}

/// A resource with its required fields checked
///
/// The original mapping is kept so primitive resources reach the config
/// exactly as they were written.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub type_name: String,
    /// The declared `properties`, if the key is present at all
    pub properties: Option<Value>,
    raw: Value,
}

impl Resource {
    /// Check a raw resource for its `name` and `type`
    pub fn from_value(value: Value) -> Result<Self, ExpansionError> {
        let Value::Mapping(map) = &value else {
            return Err(ExpansionError::invalid_resource(
                "Resource is not a mapping.",
                &value,
            ));
        };

        let name = match map.get("name") {
            None => return Err(ExpansionError::missing_name(&value)),
            Some(name) => scalar_string(name).ok_or_else(|| {
                ExpansionError::invalid_resource("Resource name must be a scalar.", &value)
            })?,
        };

        let type_name = match map.get("type") {
            None => return Err(ExpansionError::missing_type(&value)),
            Some(Value::String(type_name)) => type_name.clone(),
            Some(_) => {
                return Err(ExpansionError::invalid_resource(
                    "Resource type must be a string.",
                    &value,
                ))
            }
        };

        let properties = map.get("properties").cloned();

        Ok(Self {
            name,
            type_name,
            properties,
            raw: value,
        })
    }

    /// Decide whether this resource is a template backed by `imports`
    pub fn kind(&self, imports: &ImportMap) -> ResourceKind {
        match TemplateKind::classify(&self.type_name, imports) {
            Some(kind) => ResourceKind::Template(kind),
            None => ResourceKind::Primitive,
        }
    }

    /// The mapping as it was written
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_value(self) -> Value {
        self.raw
    }
}

/// The name of a sibling for uniqueness checks, as written
///
/// Compared as YAML values, so `1` and `"1"` are different names.
pub(crate) fn sibling_name(value: &Value) -> Option<&Value> {
    value.get("name")
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
