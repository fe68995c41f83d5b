//! Root document parsing and normalization

use serde_yaml::Value;

use crate::error::ExpansionError;

/// The shape of a parsed root document
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    /// Nothing to expand (empty input, `null`, or an empty or falsy value)
    Empty,
    /// The input was a bare scalar string; it is returned untouched
    Passthrough(String),
    /// The top-level resources, with a missing or `null` list normalized to empty
    Resources(Vec<Value>),
}

/// Parse raw document text into its top-level resources
pub fn parse_document(source: &str) -> Result<ParsedDocument, ExpansionError> {
    let value: Value = serde_yaml::from_str(source).map_err(|e| ExpansionError::parse(&e))?;
    normalize(value)
}

fn normalize(value: Value) -> Result<ParsedDocument, ExpansionError> {
    if is_falsy(&value) {
        return Ok(ParsedDocument::Empty);
    }
    match value {
        Value::String(text) => Ok(ParsedDocument::Passthrough(text)),
        Value::Mapping(mut map) => match map.remove("resources") {
            None | Some(Value::Null) => Ok(ParsedDocument::Resources(Vec::new())),
            Some(Value::Sequence(resources)) => Ok(ParsedDocument::Resources(resources)),
            Some(_) => Err(ExpansionError::InvalidDocument {
                message: "'resources' must be a list".to_string(),
            }),
        },
        _ => Err(ExpansionError::InvalidDocument {
            message: "expected a mapping with a 'resources' field".to_string(),
        }),
    }
}

/// Null, `false`, zero, and empty strings, lists or mappings
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(_) => false,
    }
}
