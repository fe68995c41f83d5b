//! Template resolution - expands resources into the flat config and the layout tree

use std::collections::HashSet;

use serde_yaml::Value;
use tracing::debug;

use crate::config::{Env, ExpandConfig};
use crate::document::resource::{scalar_string, sibling_name};
use crate::document::{Config, Expansion, LayoutNode, ProcessedResource, Resource, ResourceKind};
use crate::error::{describe, ExpansionError, ROOT_CONTEXT};
use crate::schema::SchemaValidator;

use super::dispatch::expand_template;
use super::kind::TemplateKind;
use super::registry::ImportMap;

/// Context for template resolution
pub struct ResolutionContext<'a> {
    pub imports: &'a ImportMap,
    /// The caller's environment; each template gets an augmented copy
    pub env: &'a Env,
    pub validate_schema: bool,
    pub max_depth: usize,
    pub validator: &'a dyn SchemaValidator,
    /// Template types currently being expanded, outermost first
    chain: Vec<String>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        imports: &'a ImportMap,
        config: &'a ExpandConfig,
        validator: &'a dyn SchemaValidator,
    ) -> Self {
        Self {
            imports,
            env: &config.env,
            validate_schema: config.validate_schema,
            max_depth: config.max_depth,
            validator,
            chain: Vec::new(),
        }
    }

    /// How many templates enclose the resource being processed
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    fn enter(&mut self, template: &str) -> Result<(), ExpansionError> {
        if self.chain.len() >= self.max_depth {
            let mut chain = self.chain.clone();
            chain.push(template.to_string());
            return Err(ExpansionError::DepthExceeded {
                template: template.to_string(),
                chain,
                max_depth: self.max_depth,
            });
        }
        self.chain.push(template.to_string());
        Ok(())
    }

    fn leave(&mut self) {
        self.chain.pop();
    }
}

/// Resolve a top-level resource list into an expansion
///
/// Names are checked for uniqueness before any resource is expanded.
pub fn resolve_resources(
    resources: Vec<Value>,
    ctx: &mut ResolutionContext<'_>,
) -> Result<Expansion, ExpansionError> {
    validate_unique_names(&resources, ROOT_CONTEXT)?;

    let mut expansion = Expansion::default();
    for resource in resources {
        let processed = process_resource(resource, ctx)?;
        expansion.push(processed);
    }
    Ok(expansion)
}

/// Process one resource, expanding it if it is a template
pub fn process_resource(
    value: Value,
    ctx: &mut ResolutionContext<'_>,
) -> Result<ProcessedResource, ExpansionError> {
    let resource = Resource::from_value(value)?;
    let mut layout = LayoutNode::new(&resource.name, &resource.type_name);

    let kind = match resource.kind(ctx.imports) {
        ResourceKind::Primitive => {
            debug!(name = %resource.name, resource_type = %resource.type_name, "primitive resource");
            return Ok(ProcessedResource {
                config: Config {
                    resources: vec![resource.into_value()],
                },
                layout,
            });
        }
        ResourceKind::Template(kind) => kind,
    };

    debug!(
        name = %resource.name,
        resource_type = %resource.type_name,
        %kind,
        depth = ctx.depth(),
        "expanding template"
    );

    ctx.enter(&resource.type_name)?;
    let result = expand_children(&resource, kind, &mut layout, ctx);
    ctx.leave();

    Ok(ProcessedResource {
        config: result?,
        layout,
    })
}

fn expand_children(
    resource: &Resource,
    kind: TemplateKind,
    layout: &mut LayoutNode,
    ctx: &mut ResolutionContext<'_>,
) -> Result<Config, ExpansionError> {
    let expanded = expand_template(resource, kind, ctx)?;
    let mut config = Config::default();

    let Some(children) = expanded.resources else {
        return Ok(config);
    };

    validate_unique_names(&children, &resource.type_name)?;

    for child in children {
        let processed = process_resource(child, ctx)?;
        config.resources.extend(processed.config.resources);
        layout.push_child(processed.layout);
    }

    // The layout shows the template's own declared properties, not its body's
    if layout.is_template() && expanded.properties.is_some() {
        layout.properties = expanded.properties;
    }

    Ok(config)
}

/// Make sure that every resource name in one sibling scope is unique
///
/// Resources without a name are skipped here; processing reports them.
pub fn validate_unique_names(resources: &[Value], scope: &str) -> Result<(), ExpansionError> {
    let mut names = HashSet::new();
    for resource in resources {
        if let Some(name) = sibling_name(resource) {
            if !names.insert(name) {
                let name = scalar_string(name).unwrap_or_else(|| describe(name));
                return Err(ExpansionError::duplicate(name, scope, resource));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonSchemaValidator;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    fn process(
        source: &str,
        imports: &ImportMap,
        config: &ExpandConfig,
    ) -> Result<ProcessedResource, ExpansionError> {
        let validator = JsonSchemaValidator;
        let mut ctx = ResolutionContext::new(imports, config, &validator);
        process_resource(yaml(source), &mut ctx)
    }

    #[test]
    fn test_unique_names_ok() {
        let resources = vec![yaml("{name: a, type: t}"), yaml("{name: b, type: t}")];
        assert!(validate_unique_names(&resources, ROOT_CONTEXT).is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        let resources = vec![yaml("{name: a, type: t}"), yaml("{name: a, type: u}")];
        let err = validate_unique_names(&resources, "net.jinja").unwrap_err();
        match err {
            ExpansionError::DuplicateName { name, scope, .. } => {
                assert_eq!(name, "a");
                assert_eq!(scope, "net.jinja");
            }
            other => panic!("expected duplicate name, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_and_string_names_are_distinct() {
        let resources = vec![yaml("{name: 1, type: t}"), yaml("{name: '1', type: t}")];
        assert!(validate_unique_names(&resources, ROOT_CONTEXT).is_ok());

        let resources = vec![yaml("{name: 1, type: t}"), yaml("{name: 1, type: u}")];
        assert!(validate_unique_names(&resources, ROOT_CONTEXT).is_err());
    }

    #[test]
    fn test_unnamed_resources_are_skipped() {
        let resources = vec![yaml("{type: t}"), yaml("{type: t}")];
        assert!(validate_unique_names(&resources, ROOT_CONTEXT).is_ok());
    }

    #[test]
    fn test_primitive_resource() {
        let out = process(
            "{name: x, type: primitive.kind, properties: {a: 1}}",
            &ImportMap::new(),
            &ExpandConfig::default(),
        )
        .unwrap();
        assert_eq!(out.config.resources, vec![yaml("{name: x, type: primitive.kind, properties: {a: 1}}")]);
        assert_eq!(out.layout, LayoutNode::new("x", "primitive.kind"));
    }

    #[test]
    fn test_template_flattens_children() {
        let imports = ImportMap::from_iter([(
            "pair.jinja",
            "resources:\n- {name: a, type: k}\n- {name: b, type: k}\n",
        )]);
        let out = process(
            "{name: t, type: pair.jinja, properties: {p: 1}}",
            &imports,
            &ExpandConfig::default(),
        )
        .unwrap();

        assert_eq!(
            out.config.resources,
            vec![yaml("{name: a, type: k}"), yaml("{name: b, type: k}")]
        );
        assert_eq!(out.layout.properties, Some(yaml("{p: 1}")));
        let children = out.layout.resources.unwrap();
        assert_eq!(children, vec![LayoutNode::new("a", "k"), LayoutNode::new("b", "k")]);
    }

    #[test]
    fn test_template_without_children_has_no_layout_resources() {
        let imports = ImportMap::from_iter([("none.jinja", "resources: []")]);
        let out = process(
            "{name: t, type: none.jinja, properties: {p: 1}}",
            &imports,
            &ExpandConfig::default(),
        )
        .unwrap();
        assert!(out.config.resources.is_empty());
        assert_eq!(out.layout.resources, None);
        assert_eq!(out.layout.properties, None);
    }

    #[test]
    fn test_duplicate_children_name_template_scope() {
        let imports = ImportMap::from_iter([(
            "dup.jinja",
            "resources:\n- {name: a, type: k}\n- {name: a, type: k}\n",
        )]);
        let err = process("{name: t, type: dup.jinja}", &imports, &ExpandConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("is not unique in dup.jinja"));
    }

    #[test]
    fn test_nested_templates() {
        let imports = ImportMap::from_iter([
            ("outer.jinja", "resources:\n- {name: inner, type: inner.jinja}\n- {name: c, type: k}\n"),
            ("inner.jinja", "resources:\n- {name: a, type: k}\n- {name: b, type: k}\n"),
        ]);
        let out = process("{name: o, type: outer.jinja}", &imports, &ExpandConfig::default())
            .unwrap();

        let names: Vec<_> = out
            .config
            .resources
            .iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let children = out.layout.resources.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].resources.as_ref().map(Vec::len), Some(2));
        assert_eq!(children[1].resources, None);
    }

    #[test]
    fn test_self_including_template_hits_depth_limit() {
        let imports = ImportMap::from_iter([(
            "loop.jinja",
            "resources:\n- {name: again, type: loop.jinja}\n",
        )]);
        let config = ExpandConfig::new().with_max_depth(4);
        let err = process("{name: l, type: loop.jinja}", &imports, &config).unwrap_err();
        match err {
            ExpansionError::DepthExceeded { chain, max_depth, .. } => {
                assert_eq!(max_depth, 4);
                assert_eq!(chain.len(), 5);
            }
            other => panic!("expected depth error, got {:?}", other),
        }
    }

    #[test]
    fn test_child_missing_type() {
        let imports = ImportMap::from_iter([("t.jinja", "resources:\n- {name: a}\n")]);
        let err = process("{name: t, type: t.jinja}", &imports, &ExpandConfig::default())
            .unwrap_err();
        assert!(matches!(err, ExpansionError::MissingType { .. }));
    }
}
