//! Schema validation of template properties
//!
//! A template type `T` may ship an artifact named `T.schema` alongside it.
//! When validation is enabled, a resource's properties are defaulted and
//! checked against that schema before the template runs. Schemas are YAML
//! (or JSON) documents in JSON Schema form:
//!
//! ```yaml
//! required: [zone]
//! properties:
//!   zone:
//!     type: string
//!   machineType:
//!     type: string
//!     default: n1-standard-1
//! ```

use serde_json::Value as JsonValue;
use serde_yaml::Value;
use thiserror::Error;

use crate::template::ImportMap;

/// Why a set of properties was rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationErrors {
    /// The schema artifact is missing or unusable
    #[error("Error parsing schema {schema}: {message}")]
    InvalidSchema { schema: String, message: String },

    /// The properties do not satisfy the schema
    #[error("Invalid properties for '{template}':\n{}", errors.join("\n"))]
    Invalid {
        template: String,
        errors: Vec<String>,
    },
}

/// Validates and defaults a template's properties
pub trait SchemaValidator: Send + Sync {
    /// Check `properties` against the schema artifact `schema_name` in
    /// `imports`, returning the properties with defaults applied
    fn validate(
        &self,
        properties: &Value,
        schema_name: &str,
        template_type: &str,
        imports: &ImportMap,
    ) -> Result<Value, ValidationErrors>;
}

/// Default validator backed by the `jsonschema` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(
        &self,
        properties: &Value,
        schema_name: &str,
        template_type: &str,
        imports: &ImportMap,
    ) -> Result<Value, ValidationErrors> {
        let invalid_schema = |message: String| ValidationErrors::InvalidSchema {
            schema: schema_name.to_string(),
            message,
        };

        let source = imports
            .get(schema_name)
            .ok_or_else(|| invalid_schema("not found in imports".to_string()))?;
        let schema: Value = serde_yaml::from_str(source).map_err(|e| invalid_schema(e.to_string()))?;
        let schema: JsonValue = serde_json::to_value(&schema).map_err(|e| invalid_schema(e.to_string()))?;

        let mut instance: JsonValue = serde_json::to_value(properties).map_err(|e| {
            ValidationErrors::Invalid {
                template: template_type.to_string(),
                errors: vec![e.to_string()],
            }
        })?;
        apply_defaults(&schema, &mut instance);

        let validator = jsonschema::validator_for(&schema).map_err(|e| invalid_schema(e.to_string()))?;
        let errors: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();

        if !errors.is_empty() {
            return Err(ValidationErrors::Invalid {
                template: template_type.to_string(),
                errors,
            });
        }

        serde_yaml::to_value(&instance).map_err(|e| ValidationErrors::Invalid {
            template: template_type.to_string(),
            errors: vec![e.to_string()],
        })
    }
}

/// Fill in `default` values for top-level properties the caller left out
fn apply_defaults(schema: &JsonValue, instance: &mut JsonValue) {
    let Some(declared) = schema.get("properties").and_then(JsonValue::as_object) else {
        return;
    };
    let Some(values) = instance.as_object_mut() else {
        return;
    };
    for (key, declaration) in declared {
        if let Some(default) = declaration.get("default") {
            values.entry(key.clone()).or_insert_with(|| default.clone());
        }
    }
}
