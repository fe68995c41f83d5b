//! Expandybird - recursive template expansion for resource configurations
//!
//! A configuration document lists named, typed resources. Resources whose
//! type names an imported template (`*.jinja` or `*.lua`) are expanded,
//! recursively, into further resources. The result has two aligned views:
//! `config`, the flat list of primitive resources, and `layout`, a tree that
//! mirrors the original nesting.
//!
//! # Example
//!
//! ```rust
//! use expandybird::{expand, Env, ImportMap};
//!
//! let imports = ImportMap::from_iter([(
//!     "pair.jinja",
//!     "resources:\n- {name: a, type: k}\n- {name: b, type: k}\n",
//! )]);
//!
//! let out = expand(
//!     "resources:\n- {name: p, type: pair.jinja}\n",
//!     &imports,
//!     &Env::new(),
//!     false,
//! )
//! .unwrap();
//!
//! assert!(out.contains("config:"));
//! assert!(out.contains("layout:"));
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod schema;
pub mod template;

pub use config::{ConfigError, Env, ExpandConfig};
pub use document::{Config, ExpandOutput, Expansion, Layout, LayoutNode, ParsedDocument};
pub use error::{ErrorKind, ExpandError, ExpansionError};
pub use schema::{JsonSchemaValidator, SchemaValidator, ValidationErrors};
pub use template::{ImportMap, TemplateKind};

use tracing::debug;

use document::parse_document;
use template::{resolve_resources, ResolutionContext};

/// Expands documents with a fixed configuration and schema validator
pub struct Expander {
    config: ExpandConfig,
    validator: Box<dyn SchemaValidator>,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new(ExpandConfig::default())
    }
}

impl Expander {
    /// Create an expander using the default JSON Schema validator
    pub fn new(config: ExpandConfig) -> Self {
        Self {
            config,
            validator: Box::new(JsonSchemaValidator),
        }
    }

    /// Replace the schema validator
    pub fn with_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// The configuration every expansion runs with
    pub fn config(&self) -> &ExpandConfig {
        &self.config
    }

    /// Expand a raw document against `imports`
    ///
    /// Any failure, wherever it happens in the tree, aborts the whole
    /// expansion and is reported as one [`ExpandError`].
    pub fn expand(&self, document: &str, imports: &ImportMap) -> Result<ExpandOutput, ExpandError> {
        self.expand_document(document, imports)
            .map_err(ExpandError::wrap)
    }

    /// Expand a raw document and serialize the result
    pub fn expand_to_string(&self, document: &str, imports: &ImportMap) -> Result<String, ExpandError> {
        self.expand(document, imports)?
            .to_yaml()
            .map_err(ExpandError::wrap)
    }

    fn expand_document(
        &self,
        document: &str,
        imports: &ImportMap,
    ) -> Result<ExpandOutput, ExpansionError> {
        let resources = match parse_document(document)? {
            ParsedDocument::Empty => return Ok(ExpandOutput::Empty),
            ParsedDocument::Passthrough(text) => return Ok(ExpandOutput::Passthrough(text)),
            ParsedDocument::Resources(resources) => resources,
        };

        debug!(
            resources = resources.len(),
            imports = imports.len(),
            validate_schema = self.config.validate_schema,
            "expanding document"
        );

        let mut ctx = ResolutionContext::new(imports, &self.config, self.validator.as_ref());
        let expansion = resolve_resources(resources, &mut ctx)?;
        Ok(ExpandOutput::Expanded(expansion))
    }
}

/// Expand a document with the given imports and environment
///
/// Returns the serialized `config`/`layout` document, the empty string for
/// an empty document, or the input itself when it is a bare string.
pub fn expand(
    document: &str,
    imports: &ImportMap,
    env: &Env,
    validate_schema: bool,
) -> Result<String, ExpandError> {
    let config = ExpandConfig::new()
        .with_env(env.clone())
        .with_schema_validation(validate_schema);
    expand_with_config(document, imports, config)
}

/// Expand a document with a custom configuration
///
/// # Example
///
/// ```rust
/// use expandybird::{expand_with_config, ExpandConfig, ImportMap};
///
/// let config = ExpandConfig::new().with_env_var("deployment", "dev");
/// let out = expand_with_config("resources: []", &ImportMap::new(), config).unwrap();
/// assert!(out.contains("resources: []"));
/// ```
pub fn expand_with_config(
    document: &str,
    imports: &ImportMap,
    config: ExpandConfig,
) -> Result<String, ExpandError> {
    Expander::new(config).expand_to_string(document, imports)
}
