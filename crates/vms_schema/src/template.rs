//! Schema template loading.
//!
//! A template is the JSON export of a collection set: an ordered array of
//! collections whose relation fields point at each other by template-local id.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vms_ids::TemplateCollectionId;

use crate::field::Field;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed template: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate collection id in template: '{0}'")]
    DuplicateId(TemplateCollectionId),
    #[error("Duplicate collection name in template: '{0}'")]
    DuplicateName(String),
    #[error("Collection '{0}' has an empty name")]
    EmptyName(TemplateCollectionId),
}

fn default_kind() -> String {
    "base".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One collection blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCollection {
    pub id: TemplateCollectionId,
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// `None` when the template declares no field list at all.
    #[serde(default, alias = "fields")]
    pub schema: Option<Vec<Field>>,
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub view_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub options: Map<String, Value>,
}

impl TemplateCollection {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: TemplateCollectionId::new(id),
            name: name.into(),
            kind: default_kind(),
            schema: None,
            list_rule: None,
            view_rule: None,
            create_rule: None,
            update_rule: None,
            delete_rule: None,
            options: Map::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.schema = Some(fields);
        self
    }

    /// Declared fields, empty when the template has no field list.
    pub fn fields(&self) -> &[Field] {
        self.schema.as_deref().unwrap_or(&[])
    }

    pub fn declares_fields(&self) -> bool {
        self.schema.is_some()
    }
}

/// A relation whose target is not part of the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRelation {
    pub collection: TemplateCollectionId,
    pub field: String,
    pub target: String,
}

/// Ordered, validated set of collection blueprints.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    collections: Vec<TemplateCollection>,
}

impl Template {
    /// Validate and wrap an ordered collection list.
    pub fn from_collections(collections: Vec<TemplateCollection>) -> Result<Self, TemplateError> {
        {
            let mut ids = HashSet::new();
            let mut names = HashSet::new();
            for collection in &collections {
                if collection.name.trim().is_empty() {
                    return Err(TemplateError::EmptyName(collection.id.clone()));
                }
                if !ids.insert(&collection.id) {
                    return Err(TemplateError::DuplicateId(collection.id.clone()));
                }
                if !names.insert(collection.name.as_str()) {
                    return Err(TemplateError::DuplicateName(collection.name.clone()));
                }
            }
        }
        Ok(Self { collections })
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        let collections: Vec<TemplateCollection> = serde_json::from_str(json)?;
        Self::from_collections(collections)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let template = Self::from_json_str(&json)?;
        tracing::debug!(
            "Loaded template {} with {} collections",
            path.display(),
            template.len()
        );
        for dangling in template.dangling_relations() {
            tracing::warn!(
                "Template relation {}.{} targets unknown collection '{}'",
                dangling.collection,
                dangling.field,
                dangling.target
            );
        }
        Ok(template)
    }

    pub fn collections(&self) -> &[TemplateCollection] {
        &self.collections
    }

    pub fn get(&self, id: &TemplateCollectionId) -> Option<&TemplateCollection> {
        self.collections.iter().find(|c| &c.id == id)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Relations pointing outside the template. These can never be wired.
    pub fn dangling_relations(&self) -> Vec<DanglingRelation> {
        let known: HashSet<&str> = self.collections.iter().map(|c| c.id.as_str()).collect();
        self.collections
            .iter()
            .flat_map(|collection| {
                collection.fields().iter().filter_map(|field| {
                    let target = field.relation_target()?;
                    (!known.contains(target)).then(|| DanglingRelation {
                        collection: collection.id.clone(),
                        field: field.name.clone(),
                        target: target.to_string(),
                    })
                })
            })
            .collect()
    }
}
