//! Core types for sherpack-dyff
//!
//! This crate provides the foundational types shared by the preview pipeline:
//! - `Values`: Configuration values with deep merge and key-path assignment
//! - `ValueSourceSet`: Ordered `-f`/`--set*` inputs and their precedence
//! - `ValueResolver`: Merges sources, falling back to the installed values
//! - `LoadedPack`: A pack on disk (Pack.yaml, values.yaml, templates/)
//! - `TemplateContext`: Template rendering context
//! - `SchemaValidator`: JSON Schema validation of values

pub mod archive;
pub mod context;
pub mod error;
pub mod pack;
pub mod schema;
pub mod value_sources;
pub mod values;

pub use context::{Capabilities, PackInfo, ReleaseInfo, TemplateContext};
pub use error::{CoreError, Result, ValidationErrorInfo};
pub use pack::{LoadedPack, Pack, PackKind, PackMetadata};
pub use schema::{Schema, SchemaValidator, ValidationResult};
pub use value_sources::{
    EffectiveValues, ValueResolver, ValueSource, ValueSourceKind, ValueSourceSet, ValuesOrigin,
};
pub use values::{PathSegment, Values};
