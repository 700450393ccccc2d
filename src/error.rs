//! Error types for the webhook
//!
//! `WebhookError` covers failures on the admission request path and maps each
//! one to the HTTP status the API server should see. `DnsConfigError` covers
//! reading and parsing the mounted DNS configuration.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors raised while serving an admission request
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The request did not declare a JSON body
    #[error("invalid Content-Type {0:?}, want application/json")]
    InvalidContentType(String),

    /// The AdmissionReview envelope could not be decoded
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    /// The response envelope or patch could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidContentType(_) | WebhookError::InvalidReview(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type WebhookResult<T> = Result<T, WebhookError>;

/// Errors raised while loading the desired DNS configuration
#[derive(Debug, thiserror::Error)]
pub enum DnsConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse DNS config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid DNS config: {0}")]
    Invalid(String),
}

impl DnsConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        DnsConfigError::Invalid(msg.into())
    }
}
