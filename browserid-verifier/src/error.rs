//! Verifier error types
//!
//! Relying parties always get HTTP 200; failures are reported in the body
//! as `{"status": "failure", "reason": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("need assertion and audience")]
    MissingParameters,

    #[error("Content-Type expected to be one of: application/x-www-form-urlencoded, application/json")]
    UnsupportedContentType,

    #[error("{0}")]
    BadRequestBody(String),

    #[error(transparent)]
    Verification(#[from] browserid_core::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let reason = self.to_string();
        match &self {
            ServiceError::Verification(e) if !e.is_expiration() => {
                tracing::info!(%reason, "Assertion verification failed");
            }
            _ => tracing::debug!(%reason, "Verification request rejected"),
        }

        let body = Json(json!({
            "status": "failure",
            "reason": reason,
        }));

        (StatusCode::OK, body).into_response()
    }
}
