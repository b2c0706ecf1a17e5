use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::export::ExportError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Nothing to export: {0}")]
    NothingToExport(String),

    #[error("An export for this document is already in progress")]
    ExportInProgress,

    #[error("Export failed: {0}")]
    ExportFailed(ExportError),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::NothingToExport => {
                AppError::NothingToExport("The document has no content to export".to_string())
            }
            other => AppError::ExportFailed(other),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        if e.is_credential() {
            AppError::Credential(e.to_string())
        } else {
            AppError::Llm(e.to_string())
        }
    }
}

impl AppError {
    /// Status, machine code and client-facing message. Logs the failure.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NothingToExport(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NOTHING_TO_EXPORT",
                msg.clone(),
            ),
            AppError::ExportInProgress => (
                StatusCode::CONFLICT,
                "EXPORT_IN_PROGRESS",
                self.to_string(),
            ),
            AppError::ExportFailed(e) => {
                tracing::error!("Export error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_FAILED",
                    "Export failed, please try again".to_string(),
                )
            }
            AppError::Credential(msg) => {
                tracing::warn!("Credential error: {msg}");
                (
                    StatusCode::UNAUTHORIZED,
                    "CREDENTIAL_ERROR",
                    "The AI service rejected the configured API key".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "The AI service failed to respond, please try again".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_errors_map_to_generic_retryable_message() {
        let response = AppError::from(ExportError::Raster("boom".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_nothing_to_export_is_unprocessable() {
        let response = AppError::from(ExportError::NothingToExport).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_credential_failures_are_distinguished() {
        let credential = AppError::from(LlmError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        });
        assert!(matches!(credential, AppError::Credential(_)));
        let generic = AppError::from(LlmError::EmptyContent);
        assert_eq!(generic.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
