//! HTTP endpoint handlers.
//!
//! - `/health` - liveness
//! - `POST /api/v1/tenants` - provision a tenant
//! - `GET /api/v1/tenants/{id}` - tenant detail

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use vms_ids::TenantId;
use vms_provision::{ProvisionError, ProvisioningResult, TenantDetail};

use super::error::AppError;
use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Provision a tenant.
///
/// # Request Body
///
/// ```json
/// {"name": "Acme"}
/// ```
///
/// # Response
///
/// `201` with
///
/// ```json
/// {"tenant_id": "k3x9q2ab", "tenant_name": "Acme", "collections_created": 1, "status": "success"}
/// ```
pub async fn create_tenant(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ProvisioningResult>), AppError> {
    let Json(body) = body.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Request must be JSON".to_string())
        }
        other => AppError::BadRequest(format!("Malformed JSON body: {}", other.body_text())),
    })?;
    let name = tenant_name(&body)?;

    let result = state.service.create_tenant_configuration(name).await?;
    if !result.report.is_clean() {
        tracing::warn!(
            "Tenant {} provisioned with {} failed and {} degraded collections",
            result.tenant_id,
            result.report.failures().count(),
            result.report.degraded().count()
        );
    }
    Ok((StatusCode::CREATED, Json(result)))
}

fn tenant_name(body: &Value) -> Result<&str, AppError> {
    match body.get("name") {
        None | Some(Value::Null) => Err(AppError::BadRequest("Missing field: name".to_string())),
        Some(Value::String(name)) => Ok(name),
        Some(_) => Err(AppError::BadRequest("Invalid type for name".to_string())),
    }
}

pub async fn get_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TenantDetail>, AppError> {
    let not_found = || AppError::NotFound(format!("Tenant '{}' not found", id));
    let tenant_id = TenantId::parse(&id).map_err(|_| not_found())?;

    match state.service.describe_tenant(&tenant_id).await {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err(not_found()),
        Err(ProvisionError::Store(e)) => Err(AppError::Upstream(e.to_string())),
        Err(e) => Err(e.into()),
    }
}
