//! Template expansion
//!
//! A resource whose `type` names an imported artifact with a template
//! suffix is a template. Expanding it runs the artifact (Jinja for
//! `.jinja`, Lua for `.lua`) with the resource's properties, the imports
//! and the environment, and yields further resources that are processed
//! in turn.
//!
//! # Example
//!
//! ```text
//! # vm.jinja
//! resources:
//! - name: {{ env.name }}-disk
//!   type: compute.v1.disk
//!   properties:
//!     sizeGb: {{ properties.diskSize }}
//! ```

mod context;
mod declarative;
mod dispatch;
mod kind;
mod registry;
mod resolver;
mod sandbox;
mod scripted;

pub use context::{augment_env, EvaluationContext, TemplateContext};
pub use declarative::expand_declarative;
pub use dispatch::{expand_template, ExpandedTemplate};
pub use kind::{TemplateKind, DECLARATIVE_SUFFIX, SCRIPTED_SUFFIX};
pub use registry::{ImportMap, SCHEMA_SUFFIX};
pub use resolver::{process_resource, resolve_resources, validate_unique_names, ResolutionContext};
pub use sandbox::module_artifact;
pub use scripted::{expand_scripted, GeneratedDocument, ENTRY_POINT};
