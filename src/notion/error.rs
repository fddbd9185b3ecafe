use serde::Deserialize;
use thiserror::Error;

/// Failures talking to the Notion API
#[derive(Error, Debug)]
pub enum NotionError {
    /// The API answered with a non-success status
    #[error("Notion API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never produced a response (timeout, DNS, TLS, reset...)
    #[error("Notion request failed: {message} (kind: {kind})")]
    Transport { kind: &'static str, message: String },

    /// The response body did not match the expected schema
    #[error("Unexpected Notion response: {0}")]
    Decode(String),
}

impl NotionError {
    pub fn status(&self) -> Option<u16> {
        match self {
            NotionError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The page exists but is not shared with us, or does not exist at all
    pub fn is_inaccessible(&self) -> bool {
        matches!(self.status(), Some(403 | 404))
    }

    /// Classify a reqwest error for logging and error payloads
    pub(crate) fn from_reqwest(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else if e.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };

        NotionError::Transport {
            kind,
            message: e.to_string(),
        }
    }

    /// Build an API error from a status code and the raw error body
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => NotionError::Api {
                status,
                code: parsed.code,
                message: parsed.message,
            },
            Err(_) => NotionError::Api {
                status,
                code: "unknown".to_string(),
                message: body.to_string(),
            },
        }
    }
}

/// Error object returned by the API: `{"object": "error", "status", "code", "message"}`
#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}
