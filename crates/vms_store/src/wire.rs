//! Request and response bodies exchanged with the store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use vms_ids::{CollectionId, RecordId, TenantId};
use vms_schema::Field;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Collection creation request.
///
/// Rules serialize as `null` when absent; the store reads `null` as "admins only".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub schema: Vec<Field>,
    pub list_rule: Option<String>,
    pub view_rule: Option<String>,
    pub create_rule: Option<String>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
    pub options: Map<String, Value>,
}

/// Replaces the full field list of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaUpdate {
    pub schema: Vec<Field>,
}

/// A collection as the store reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: CollectionId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, alias = "fields", deserialize_with = "null_as_default")]
    pub schema: Vec<Field>,
}

impl CollectionRecord {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.schema.iter().find(|f| f.name == name)
    }
}

/// A row of the tenants collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: RecordId,
    pub name: String,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTenant<'a> {
    pub name: &'a str,
    pub tenant_id: &'a TenantId,
}

/// One page of a list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Serialize)]
pub(crate) struct AdminCredentials<'a> {
    pub identity: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    pub token: String,
}

/// Error body: `{"code": 400, "message": "...", "data": {"field": {"code": "...", "message": "..."}}}`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
}

impl ApiErrorBody {
    /// Any field-level violation carrying `code`.
    pub fn has_violation(&self, code: &str) -> bool {
        self.data
            .values()
            .any(|v| v.get("code").and_then(Value::as_str) == Some(code))
    }

    pub fn describe(&self) -> String {
        if self.data.is_empty() {
            return self.message.clone();
        }
        let details: Vec<String> = self
            .data
            .iter()
            .map(|(field, v)| {
                let detail = v
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("invalid");
                format!("{}: {}", field, detail)
            })
            .collect();
        format!("{} ({})", self.message, details.join("; "))
    }
}

/// Admin token obtained from the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_collection_wire_shape() {
        let spec = NewCollection {
            name: "vms_abc_items".into(),
            kind: "base".into(),
            schema: vec![Field::text("label")],
            list_rule: Some(String::new()),
            view_rule: None,
            create_rule: None,
            update_rule: None,
            delete_rule: None,
            options: Map::new(),
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], json!("base"));
        assert_eq!(value["listRule"], json!(""));
        assert_eq!(value["viewRule"], Value::Null);
        assert_eq!(value["schema"][0]["name"], json!("label"));
    }

    #[test]
    fn test_collection_record_accepts_null_schema() {
        let record: CollectionRecord =
            serde_json::from_value(json!({"id": "c1", "name": "x", "type": "view", "schema": null}))
                .unwrap();
        assert!(record.schema.is_empty());
    }

    #[test]
    fn test_error_body_violation() {
        let body: ApiErrorBody = serde_json::from_value(json!({
            "code": 400,
            "message": "Failed to create record.",
            "data": {"tenant_id": {"code": "validation_not_unique", "message": "Value must be unique."}}
        }))
        .unwrap();

        assert!(body.has_violation("validation_not_unique"));
        assert_eq!(
            body.describe(),
            "Failed to create record. (tenant_id: Value must be unique.)"
        );
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::new("secret-token");
        assert!(!format!("{:?}", session).contains("secret-token"));
    }
}
