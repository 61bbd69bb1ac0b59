//! Schema templates for tenant provisioning
//!
//! A template describes a graph of collections. Relation fields reference other
//! collections by template-local id, which means nothing to the store until the
//! collections exist; this crate only models and classifies, it never talks to
//! the store.
//!
//! # Modules
//!
//! - [`field`]: field definitions and typed relation options
//! - [`template`]: template loading and validation
//! - [`classify`]: relational / non-relational split and normalisation

pub mod classify;
pub mod field;
pub mod template;

pub use classify::{
    classify, extract_non_relational, extract_relational, is_relational, normalize, Classification,
};
pub use field::{Field, FieldOptions, FieldType, RelationOptions};
pub use template::{DanglingRelation, Template, TemplateCollection, TemplateError};
