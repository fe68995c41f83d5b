//! Declarative (Jinja) template expansion

use minijinja::Value as JinjaValue;

use crate::error::ExpansionError;

use super::context::TemplateContext;
use super::registry::ImportMap;
use super::sandbox;

/// Render a Jinja template body against the augmented resource
///
/// `{% include %}` and friends resolve against `imports` only.
pub fn expand_declarative(
    source: &str,
    context: &TemplateContext,
    imports: &ImportMap,
) -> Result<String, ExpansionError> {
    let env = sandbox::jinja_environment(imports);
    let name = context.type_name.as_str();

    let rendered = if context.has_bindings() {
        env.render_named_str(name, source, JinjaValue::from_serialize(context))
    } else {
        env.render_named_str(name, source, ())
    };

    rendered.map_err(|err| ExpansionError::Render {
        template: context.type_name.clone(),
        message: render_message(&err),
    })
}

/// The error plus its chain of causes (errors raised inside includes)
fn render_message(err: &minijinja::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(&format!("\ncaused by: {}", cause));
        source = cause.source();
    }
    message
}
