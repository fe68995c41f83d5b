//! Error types for document expansion

use ariadne::{Color, Label, Report, ReportKind, Source};
use serde_yaml::Value;
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Context label used when an error escapes the whole expansion
pub const ROOT_CONTEXT: &str = "config";

/// Coarse category of an expansion failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document or a template's output is not valid YAML
    Parse,
    /// A resource or template output has the wrong structure
    Shape,
    /// A template type is missing from the imports
    Reference,
    /// Two siblings share a name
    DuplicateName,
    /// Schema validation rejected the properties
    Validation,
    /// A template body failed while rendering or executing
    Execution,
}

/// Errors raised while expanding a single resource or document
#[derive(Debug, Error)]
pub enum ExpansionError {
    /// The root document is not valid YAML
    #[error("Error parsing YAML: {message}")]
    Parse {
        message: String,
        span: Option<Span>,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// The root document parsed, but is not a resource mapping
    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },

    /// A resource entry is not a mapping, or its name/type is not a scalar
    #[error("{reason} Resource: {resource}")]
    InvalidResource { reason: String, resource: String },

    #[error("Resource does not have a name. Resource: {resource}")]
    MissingName { resource: String },

    #[error("Resource does not have type defined. Resource: {resource}")]
    MissingType { resource: String },

    /// Two siblings in one scope share a name
    #[error("Resource name '{name}' is not unique in {scope}. Resource: {resource}")]
    DuplicateName {
        name: String,
        scope: String,
        resource: String,
    },

    /// A template type has no backing artifact
    #[error("Unable to find source file {source_file} in imports. Resource: {source_file}")]
    TemplateNotFound { source_file: String },

    #[error("Template did not return a 'resources:' field. Resource: {template}")]
    MissingResources { template: String },

    #[error("Template 'resources:' field is not a list. Resource: {template}")]
    MalformedResources { template: String },

    /// A template rendered text that is not valid YAML
    #[error("Template produced invalid YAML: {message} Resource: {template}")]
    TemplateOutput { template: String, message: String },

    /// Schema validation rejected the resource's properties
    #[error("{message} Resource: {resource}")]
    Validation { resource: String, message: String },

    /// A declarative template failed to render
    #[error("Error rendering template {template}: {message} Resource: {template}")]
    Render { template: String, message: String },

    /// A scripted template failed to compile or run
    #[error("Exception in {source_file}\n{trace} Resource: {source_file}")]
    Execution { source_file: String, trace: String },

    /// Templates nested deeper than the configured limit
    #[error(
        "Template nesting exceeds maximum depth of {max_depth}: {} Resource: {template}",
        chain.join(" -> ")
    )]
    DepthExceeded {
        template: String,
        chain: Vec<String>,
        max_depth: usize,
    },

    #[error("Failed to serialize expansion: {message}")]
    Serialize { message: String },
}

impl ExpansionError {
    /// Build a root document parse error from a YAML error
    pub fn parse(err: &serde_yaml::Error) -> Self {
        let location = err.location();
        Self::Parse {
            message: err
                .to_string()
                .replacen(" at line ", " in template at line ", 1),
            span: location.as_ref().map(|l| l.index()..l.index() + 1),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    }

    pub fn missing_name(resource: &Value) -> Self {
        Self::MissingName {
            resource: describe(resource),
        }
    }

    pub fn missing_type(resource: &Value) -> Self {
        Self::MissingType {
            resource: describe(resource),
        }
    }

    pub fn invalid_resource(reason: impl Into<String>, resource: &Value) -> Self {
        Self::InvalidResource {
            reason: reason.into(),
            resource: describe(resource),
        }
    }

    /// Create a duplicate name error for `resource` within `scope`
    pub fn duplicate(name: impl Into<String>, scope: impl Into<String>, resource: &Value) -> Self {
        Self::DuplicateName {
            name: name.into(),
            scope: scope.into(),
            resource: describe(resource),
        }
    }

    /// The coarse category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } | Self::TemplateOutput { .. } => ErrorKind::Parse,
            Self::InvalidDocument { .. }
            | Self::InvalidResource { .. }
            | Self::MissingName { .. }
            | Self::MissingType { .. }
            | Self::MissingResources { .. }
            | Self::MalformedResources { .. }
            | Self::DepthExceeded { .. }
            | Self::Serialize { .. } => ErrorKind::Shape,
            Self::TemplateNotFound { .. } => ErrorKind::Reference,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Render { .. } | Self::Execution { .. } => ErrorKind::Execution,
        }
    }
}

/// The uniform error returned by a whole expansion
#[derive(Debug, Error)]
#[error("{error} Resource: {context}")]
pub struct ExpandError {
    /// What was being expanded when the failure escaped
    pub context: String,
    #[source]
    pub error: ExpansionError,
}

impl ExpandError {
    /// Wrap an inner failure with the root context
    pub fn wrap(error: ExpansionError) -> Self {
        Self {
            context: ROOT_CONTEXT.to_string(),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Format the error, with source context for root parse errors
    pub fn format(&self, source: &str) -> String {
        let ExpansionError::Parse {
            message,
            span: Some(span),
            ..
        } = &self.error
        else {
            return self.to_string();
        };

        let filename = "template";
        let start = span.start.min(source.len());
        let end = span.end.min(source.len()).max(start);

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, start)
            .with_message("Error parsing YAML")
            .with_label(
                Label::new((filename, start..end))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

impl From<ExpansionError> for ExpandError {
    fn from(error: ExpansionError) -> Self {
        Self::wrap(error)
    }
}

/// Render a resource on a single line for error messages
pub fn describe(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}
