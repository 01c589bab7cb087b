//! Common error type for the relay and its HTTP mapping.
//!
//! Every handler returns [`AppResult`]; [`AppError`] renders as
//! `{"error": <message>, "code": <CODE>}` with a status that tells callers
//! whether their input, our configuration, or an upstream service failed.
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::workflow::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("ComfyUI request failed: {0}")]
    ComfyUI(String),

    #[error("Language model request failed: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        AppError::InvalidField { field: field.to_string(), reason: reason.into() }
    }

    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::MissingField(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELD"),
            AppError::InvalidField { .. } => (StatusCode::BAD_REQUEST, "INVALID_FIELD"),
            AppError::Workflow(_) => (StatusCode::INTERNAL_SERVER_ERROR, "WORKFLOW_ERROR"),
            AppError::HttpClient(_) | AppError::ComfyUI(_) | AppError::Llm(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Io(_) | AppError::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => tracing::debug!(error = %self, "request rejected"),
            s if s.is_client_error() => tracing::warn!(error = %self, "bad request"),
            _ => tracing::error!(error = %self, code, "request failed"),
        }

        let body = json!({
            "error": self.to_string(),
            "code": code,
        });
        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"gallery\""),
            );
        }
        response
    }
}
