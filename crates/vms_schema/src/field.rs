//! Field definitions as they appear in templates and on the store wire.
//!
//! Options are modelled per field type where the shape matters to provisioning
//! (relations) and kept as an opaque bag everywhere else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Editor,
    Number,
    Bool,
    Email,
    Url,
    Date,
    /// Timestamp maintained by the store itself (created/updated).
    Autodate,
    Select,
    Json,
    File,
    Relation,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Editor => "editor",
            FieldType::Number => "number",
            FieldType::Bool => "bool",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Date => "date",
            FieldType::Autodate => "autodate",
            FieldType::Select => "select",
            FieldType::Json => "json",
            FieldType::File => "file",
            FieldType::Relation => "relation",
            FieldType::Other(tag) => tag,
        }
    }

    /// Types the store maintains on its own and refuses in a creation request.
    pub fn is_auto_timestamp(&self) -> bool {
        matches!(self, FieldType::Autodate)
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "text" => FieldType::Text,
            "editor" => FieldType::Editor,
            "number" => FieldType::Number,
            "bool" => FieldType::Bool,
            "email" => FieldType::Email,
            "url" => FieldType::Url,
            "date" => FieldType::Date,
            "autodate" => FieldType::Autodate,
            "select" => FieldType::Select,
            "json" => FieldType::Json,
            "file" => FieldType::File,
            "relation" => FieldType::Relation,
            _ => FieldType::Other(tag),
        }
    }
}

impl From<&str> for FieldType {
    fn from(tag: &str) -> Self {
        FieldType::from(tag.to_string())
    }
}

impl From<FieldType> for String {
    fn from(kind: FieldType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options of a relation field.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationOptions {
    /// Target collection. Template-local in a template, store-assigned after wiring.
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub cascade_delete: Option<bool>,
    #[serde(default)]
    pub min_select: Option<u64>,
    #[serde(default)]
    pub max_select: Option<u64>,
    #[serde(default)]
    pub display_fields: Option<Vec<String>>,
    /// Keys this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RelationOptions {
    pub fn targeting(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: Some(collection_id.into()),
            ..Self::default()
        }
    }

    /// Options pointing at `collection_id`, carrying only the keys the store
    /// needs to recreate the relation. Unknown keys are dropped.
    pub fn retarget(&self, collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: Some(collection_id.into()),
            cascade_delete: Some(self.cascade_delete.unwrap_or(false)),
            min_select: self.min_select,
            max_select: self.max_select,
            display_fields: self.display_fields.clone(),
            extra: Map::new(),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(id) = &self.collection_id {
            map.insert("collectionId".into(), Value::String(id.clone()));
        }
        map.insert(
            "cascadeDelete".into(),
            self.cascade_delete.map(Value::Bool).unwrap_or(Value::Null),
        );
        map.insert(
            "minSelect".into(),
            self.min_select.map(Value::from).unwrap_or(Value::Null),
        );
        map.insert(
            "maxSelect".into(),
            self.max_select.map(Value::from).unwrap_or(Value::Null),
        );
        map.insert(
            "displayFields".into(),
            self.display_fields
                .as_ref()
                .map(|fields| Value::from(fields.clone()))
                .unwrap_or(Value::Null),
        );
        for (key, value) in &self.extra {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }
}

/// Type-specific field options.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOptions {
    Relation(RelationOptions),
    Other(Map<String, Value>),
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions::Other(Map::new())
    }
}

/// Relation option keys carried over when a relation is retargeted.
const RETARGET_KEYS: [&str; 3] = ["minSelect", "maxSelect", "displayFields"];

impl FieldOptions {
    fn parse(kind: &FieldType, raw: Value) -> Self {
        match raw {
            Value::Object(map) if *kind == FieldType::Relation => {
                match serde_json::from_value::<RelationOptions>(Value::Object(map.clone())) {
                    // A null target stays as written so the key is not lost.
                    Ok(options)
                        if options.collection_id.is_some() || !map.contains_key("collectionId") =>
                    {
                        FieldOptions::Relation(options)
                    }
                    Ok(_) => FieldOptions::Other(map),
                    Err(e) => {
                        tracing::debug!("Relation options kept opaque: {}", e);
                        FieldOptions::Other(map)
                    }
                }
            }
            Value::Object(map) => FieldOptions::Other(map),
            _ => FieldOptions::default(),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            FieldOptions::Relation(options) => options.to_map(),
            FieldOptions::Other(map) => map.clone(),
        }
    }

    /// True if the options carry a `collectionId` key, whatever its value.
    pub fn declares_target(&self) -> bool {
        match self {
            FieldOptions::Relation(options) => options.collection_id.is_some(),
            FieldOptions::Other(map) => map.contains_key("collectionId"),
        }
    }

    /// `collectionId` exactly as written, if present.
    pub fn raw_target(&self) -> Option<Value> {
        match self {
            FieldOptions::Relation(options) => options.collection_id.clone().map(Value::String),
            FieldOptions::Other(map) => map.get("collectionId").cloned(),
        }
    }

    /// Options pointing at `collection_id`. Opaque options keep the values of
    /// the carried keys as written, even when they do not fit the typed model.
    pub fn retarget(&self, collection_id: &str) -> FieldOptions {
        match self {
            FieldOptions::Relation(options) => {
                FieldOptions::Relation(options.retarget(collection_id))
            }
            FieldOptions::Other(map) => {
                let mut retargeted = Map::new();
                retargeted.insert("collectionId".into(), Value::String(collection_id.into()));
                let cascade = map
                    .get("cascadeDelete")
                    .filter(|v| !v.is_null())
                    .cloned()
                    .unwrap_or(Value::Bool(false));
                retargeted.insert("cascadeDelete".into(), cascade);
                for key in RETARGET_KEYS {
                    let value = map.get(key).cloned().unwrap_or(Value::Null);
                    retargeted.insert(key.into(), value);
                }
                FieldOptions::Other(retargeted)
            }
        }
    }
}

/// One field of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub presentable: bool,
    pub unique: bool,
    pub options: FieldOptions,
    /// Properties outside the accepted set (`id`, `system`, `hidden`, ...).
    pub extra: Map<String, Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required: false,
            presentable: false,
            unique: false,
            options: FieldOptions::default(),
            extra: Map::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn relation(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldType::Relation)
            .with_options(FieldOptions::Relation(RelationOptions::targeting(target)))
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Relation options, if this is a relation field with typed options.
    pub fn relation_options(&self) -> Option<&RelationOptions> {
        match (&self.field_type, &self.options) {
            (FieldType::Relation, FieldOptions::Relation(options)) => Some(options),
            _ => None,
        }
    }

    /// Collection this field points at, if it is a relation with a string target.
    pub fn relation_target(&self) -> Option<&str> {
        match (&self.field_type, &self.options) {
            (FieldType::Relation, FieldOptions::Relation(options)) => {
                options.collection_id.as_deref()
            }
            (FieldType::Relation, FieldOptions::Other(map)) => {
                map.get("collectionId").and_then(Value::as_str)
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    presentable: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    options: Value,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawField> for Field {
    fn from(raw: RawField) -> Self {
        let options = FieldOptions::parse(&raw.field_type, raw.options);
        Self {
            name: raw.name,
            field_type: raw.field_type,
            required: raw.required,
            presentable: raw.presentable,
            unique: raw.unique,
            options,
            extra: raw.extra,
        }
    }
}

impl From<Field> for RawField {
    fn from(field: Field) -> Self {
        Self {
            options: Value::Object(field.options.to_map()),
            name: field.name,
            field_type: field.field_type,
            required: field.required,
            presentable: field.presentable,
            unique: field.unique,
            extra: field.extra,
        }
    }
}
