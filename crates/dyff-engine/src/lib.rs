//! Jinja2 rendering of Sherpack packs
//!
//! This crate provides a MiniJinja-based template engine with:
//! - Kubernetes-oriented filters (toyaml, b64encode, nindent, ...)
//! - Helm-style helper functions (dict, ternary, printf, ...)
//! - Template errors with source spans and spelling suggestions

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod suggestions;

pub use engine::{Engine, EngineBuilder, RenderResult};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
