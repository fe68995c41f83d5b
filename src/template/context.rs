//! What a template sees when it is expanded

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::config::Env;
use crate::document::Resource;

use super::registry::ImportMap;

/// Resource keys the context sets itself
const INJECTED_KEYS: [&str; 5] = ["name", "type", "properties", "imports", "env"];

/// A template resource augmented with the imports and its own environment
///
/// Built fresh for every template so that one resource's `name`/`type`
/// never leak into a sibling's environment.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    pub imports: ImportMap,
    pub env: Env,
    /// Any other keys written on the resource, rendered as-is
    #[serde(flatten)]
    pub extra: Mapping,
}

impl TemplateContext {
    /// Augment `resource` for expansion; `properties` may differ from the
    /// declared ones after schema validation
    pub fn new(
        resource: &Resource,
        properties: Option<Value>,
        imports: &ImportMap,
        caller_env: &Env,
    ) -> Self {
        Self {
            name: resource.name.clone(),
            type_name: resource.type_name.clone(),
            properties,
            imports: imports.clone(),
            env: augment_env(caller_env, &resource.name, &resource.type_name),
            extra: extra_fields(resource.raw()),
        }
    }

    /// Whether there is anything worth binding into a render context
    pub fn has_bindings(&self) -> bool {
        self.properties.is_some()
            || !self.env.is_empty()
            || !self.imports.is_empty()
            || !self.extra.is_empty()
    }

    /// The narrow view handed to scripted templates
    pub fn evaluation_context(&self) -> EvaluationContext<'_> {
        EvaluationContext {
            properties: self.properties.as_ref(),
            imports: Some(&self.imports),
            env: Some(&self.env),
        }
    }
}

/// Read-only `properties`, `imports` and `env` for a scripted template
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EvaluationContext<'a> {
    pub properties: Option<&'a Value>,
    pub imports: Option<&'a ImportMap>,
    pub env: Option<&'a Env>,
}

fn extra_fields(raw: &Value) -> Mapping {
    let mut extra = match raw {
        Value::Mapping(map) => map.clone(),
        _ => Mapping::new(),
    };
    for key in INJECTED_KEYS {
        extra.remove(key);
    }
    extra
}

/// Copy the caller's environment and add the resource's own name and type
pub fn augment_env(env: &Env, name: &str, type_name: &str) -> Env {
    let mut env = env.clone();
    env.insert("name".to_string(), name.to_string());
    env.insert("type".to_string(), type_name.to_string());
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(source: &str) -> Resource {
        Resource::from_value(serde_yaml::from_str(source).unwrap()).unwrap()
    }

    #[test]
    fn test_augment_env_does_not_touch_caller() {
        let mut caller = Env::new();
        caller.insert("deployment".to_string(), "dev".to_string());

        let augmented = augment_env(&caller, "vm", "vm.jinja");

        assert_eq!(caller.len(), 1);
        assert_eq!(augmented.get("deployment").map(String::as_str), Some("dev"));
        assert_eq!(augmented.get("name").map(String::as_str), Some("vm"));
        assert_eq!(augmented.get("type").map(String::as_str), Some("vm.jinja"));
    }

    #[test]
    fn test_siblings_get_their_own_env() {
        let caller = Env::new();
        let imports = ImportMap::new();
        let a = TemplateContext::new(&resource("{name: a, type: t.jinja}"), None, &imports, &caller);
        let b = TemplateContext::new(&resource("{name: b, type: t.jinja}"), None, &imports, &caller);

        assert_eq!(a.env.get("name").map(String::as_str), Some("a"));
        assert_eq!(b.env.get("name").map(String::as_str), Some("b"));
        assert!(caller.is_empty());
    }

    #[test]
    fn test_serialized_context_omits_missing_properties() {
        let ctx = TemplateContext::new(
            &resource("{name: a, type: t.jinja}"),
            None,
            &ImportMap::new(),
            &Env::new(),
        );
        let value = serde_yaml::to_value(&ctx).unwrap();
        assert!(value.get("properties").is_none());
        assert_eq!(value.get("env").and_then(|e| e.get("name")), Some(&Value::from("a")));
    }

    #[test]
    fn test_serialized_context_keeps_other_resource_fields() {
        let mut caller = Env::new();
        caller.insert("deployment".to_string(), "dev".to_string());
        let ctx = TemplateContext::new(
            &resource("{name: a, type: t.jinja, metadata: {tier: gold}, env: {stale: x}}"),
            None,
            &ImportMap::new(),
            &caller,
        );
        let value = serde_yaml::to_value(&ctx).unwrap();
        assert_eq!(
            value.get("metadata").and_then(|m| m.get("tier")),
            Some(&Value::from("gold"))
        );
        // Injected keys replace whatever the resource declared
        assert!(value.get("env").and_then(|e| e.get("stale")).is_none());
        assert_eq!(
            value.get("env").and_then(|e| e.get("deployment")),
            Some(&Value::from("dev"))
        );
    }

    #[test]
    fn test_evaluation_context_defaults_properties_to_none() {
        let ctx = TemplateContext::new(
            &resource("{name: a, type: t.lua}"),
            None,
            &ImportMap::new(),
            &Env::new(),
        );
        let eval = ctx.evaluation_context();
        assert!(eval.properties.is_none());
        assert!(eval.imports.is_some());
        assert!(eval.env.is_some());
    }
}
