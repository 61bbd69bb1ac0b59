//! API error responses.
//!
//! Every error body has the shape `{"status": "error", "message": "..."}`.
//! Provisioning failures are reported with one generic message; the detail
//! goes to the log only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vms_provision::ProvisionError;

pub const PROVISIONING_FAILED: &str = "Failed to create tenant configuration";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    /// The request itself is unusable.
    BadRequest(String),
    NotFound(String),
    Provisioning(ProvisionError),
    /// The store could not answer a read.
    Upstream(String),
}

impl From<ProvisionError> for AppError {
    fn from(e: ProvisionError) -> Self {
        AppError::Provisioning(e)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Provisioning(e) => write!(f, "Provisioning failed: {}", e),
            AppError::Upstream(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Provisioning(ProvisionError::InvalidName(reason)) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid tenant name: {}", reason),
            ),
            AppError::Provisioning(e) => {
                tracing::error!("Tenant provisioning failed: {}", e);
                (StatusCode::BAD_REQUEST, PROVISIONING_FAILED.to_string())
            }
            AppError::Upstream(msg) => {
                tracing::error!("Store read failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "Store unavailable".to_string())
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
