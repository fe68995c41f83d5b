//! Template expansion dispatch: validate, augment, run the right expander

use serde_yaml::{Mapping, Value};
use tracing::{debug_span, trace};

use crate::document::Resource;
use crate::error::{describe, ExpansionError};

use super::context::TemplateContext;
use super::declarative::expand_declarative;
use super::kind::TemplateKind;
use super::resolver::ResolutionContext;
use super::scripted::{expand_scripted, GeneratedDocument};

/// The result of running one template
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedTemplate {
    /// The template resource's properties after schema validation
    pub properties: Option<Value>,
    /// Child resources, or `None` if the template returned `resources: null`
    pub resources: Option<Vec<Value>>,
}

/// Expand a template resource into its child resources
pub fn expand_template(
    resource: &Resource,
    kind: TemplateKind,
    ctx: &ResolutionContext<'_>,
) -> Result<ExpandedTemplate, ExpansionError> {
    let source_file = resource.type_name.as_str();
    let _span = debug_span!("expand_template", name = %resource.name, source_file, %kind).entered();

    let source = ctx
        .imports
        .get(source_file)
        .ok_or_else(|| ExpansionError::TemplateNotFound {
            source_file: source_file.to_string(),
        })?;

    let properties = validated_properties(resource, ctx)?;
    let context = TemplateContext::new(resource, properties, ctx.imports, ctx.env);

    let document = match kind {
        TemplateKind::Declarative => {
            let text = expand_declarative(source, &context, ctx.imports)?;
            trace!(bytes = text.len(), "rendered declarative template");
            parse_output(source_file, &text)?
        }
        TemplateKind::Scripted => match expand_scripted(source, source_file, &context)? {
            GeneratedDocument::Text(text) => {
                trace!(bytes = text.len(), "scripted template returned text");
                parse_output(source_file, &text)?
            }
            GeneratedDocument::Structured(document) => document,
        },
    };

    Ok(ExpandedTemplate {
        properties: context.properties,
        resources: child_resources(source_file, document)?,
    })
}

/// Run schema validation when it is enabled and the template ships a schema
fn validated_properties(
    resource: &Resource,
    ctx: &ResolutionContext<'_>,
) -> Result<Option<Value>, ExpansionError> {
    if !ctx.validate_schema {
        return Ok(resource.properties.clone());
    }
    let Some(schema) = ctx.imports.schema_for(&resource.type_name) else {
        return Ok(resource.properties.clone());
    };

    let properties = resource
        .properties
        .clone()
        .unwrap_or_else(|| Value::Mapping(Mapping::new()));

    ctx.validator
        .validate(&properties, &schema, &resource.type_name, ctx.imports)
        .map(Some)
        .map_err(|e| ExpansionError::Validation {
            resource: describe(resource.raw()),
            message: e.to_string(),
        })
}

fn parse_output(template: &str, text: &str) -> Result<Value, ExpansionError> {
    serde_yaml::from_str(text).map_err(|e| ExpansionError::TemplateOutput {
        template: template.to_string(),
        message: e.to_string(),
    })
}

/// Pull the `resources` list out of a template's document
fn child_resources(template: &str, document: Value) -> Result<Option<Vec<Value>>, ExpansionError> {
    let Value::Mapping(mut document) = document else {
        return Err(ExpansionError::MissingResources {
            template: template.to_string(),
        });
    };

    match document.remove("resources") {
        None => Err(ExpansionError::MissingResources {
            template: template.to_string(),
        }),
        Some(Value::Null) => Ok(None),
        Some(Value::Sequence(resources)) => Ok(Some(resources)),
        Some(_) => Err(ExpansionError::MalformedResources {
            template: template.to_string(),
        }),
    }
}
