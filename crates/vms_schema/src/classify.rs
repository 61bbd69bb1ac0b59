//! Field classification and normalisation.
//!
//! The store rejects field properties it does not know and refuses automatic
//! timestamps in creation requests, so every field is normalised before it is
//! submitted. Classification always looks at the field as written in the
//! template: options are inspected before anything is stripped.

use serde_json::Map;

use crate::field::{Field, FieldType};
use crate::template::TemplateCollection;

/// Field properties the store accepts.
pub const ACCEPTED_FIELD_PROPERTIES: [&str; 6] =
    ["name", "type", "required", "presentable", "unique", "options"];

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub relational: bool,
    pub normalized: Field,
}

/// Relation type whose options name a `collectionId`, decided on the options as
/// written so a loosely shaped option bag still counts.
pub fn is_relational(field: &Field) -> bool {
    field.field_type == FieldType::Relation && field.options.declares_target()
}

/// Copy of `field` reduced to [`ACCEPTED_FIELD_PROPERTIES`], with automatic
/// timestamps rewritten to plain dates.
pub fn normalize(field: &Field) -> Field {
    let field_type = if field.field_type.is_auto_timestamp() {
        FieldType::Date
    } else {
        field.field_type.clone()
    };
    Field {
        name: field.name.clone(),
        field_type,
        required: field.required,
        presentable: field.presentable,
        unique: field.unique,
        options: field.options.clone(),
        extra: Map::new(),
    }
}

pub fn classify(field: &Field) -> Classification {
    Classification {
        relational: is_relational(field),
        normalized: normalize(field),
    }
}

/// Normalised non-relational fields, in template order.
pub fn extract_non_relational(collection: &TemplateCollection) -> Vec<Field> {
    partition(collection, false)
}

/// Normalised relational fields, in template order.
pub fn extract_relational(collection: &TemplateCollection) -> Vec<Field> {
    partition(collection, true)
}

fn partition(collection: &TemplateCollection, relational: bool) -> Vec<Field> {
    collection
        .fields()
        .iter()
        .map(classify)
        .filter(|c| c.relational == relational)
        .map(|c| c.normalized)
        .collect()
}
