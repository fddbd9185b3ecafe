// Error handling module
// Defines the HTTP-facing error taxonomy and its JSON response conversion

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::StoreError;
use crate::notion::NotionError;

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, malformed or expired session token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The session's tenant has no stored credential
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// The remote API rejected the stored credential
    #[error("Credential expired: {0}")]
    CredentialExpired(String),

    /// The credential may not access the requested resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist (or is not shared with the integration)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request validation error
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The remote API failed, timed out or answered with an unexpected shape
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable kind string carried in every error payload
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::CredentialNotFound(_) => "credential_not_found",
            ApiError::CredentialExpired(_) => "credential_expired",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::ValidationFailed(_) => "validation_failed",
            ApiError::RemoteUnavailable(_) => "remote_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_)
            | ApiError::CredentialNotFound(_)
            | ApiError::CredentialExpired(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Remote failures are translated here, at the service boundary
impl From<NotionError> for ApiError {
    fn from(err: NotionError) -> Self {
        match err {
            NotionError::Api {
                status, message, ..
            } => match status {
                400 | 422 => ApiError::ValidationFailed(message),
                401 => ApiError::CredentialExpired(message),
                403 => ApiError::Forbidden(message),
                404 => ApiError::NotFound(message),
                _ => ApiError::RemoteUnavailable(format!("Notion API returned {}: {}", status, message)),
            },
            NotionError::Transport { kind, message } => {
                ApiError::RemoteUnavailable(format!("{} ({})", message, kind))
            }
            NotionError::Decode(msg) => {
                ApiError::RemoteUnavailable(format!("unexpected response shape: {}", msg))
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::ValidationFailed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::ValidationFailed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.kind();
        let message = match self {
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                "Internal server error".to_string()
            }
            ApiError::RemoteUnavailable(msg) => {
                tracing::warn!("Remote unavailable: {}", msg);
                msg
            }
            ApiError::Unauthorized(msg)
            | ApiError::CredentialNotFound(msg)
            | ApiError::CredentialExpired(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::ValidationFailed(msg) => msg,
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}
