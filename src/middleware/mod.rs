// Session authentication and CORS middleware

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{token_prefix, CredentialStore};
use crate::error::ApiError;
use crate::resolver::RequestContext;

/// Bearer token from the Authorization header, if well formed
pub fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Session middleware
///
/// Maps `Authorization: Bearer <session token>` to the session's tenant and
/// attaches a [`RequestContext`] for the handlers. Unknown or expired tokens
/// are rejected before any remote call is made.
pub async fn session_middleware(
    State(store): State<Arc<CredentialStore>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&request) else {
        tracing::warn!(
            "Request without session token: {} {}",
            request.method(),
            request.uri().path()
        );
        return Err(ApiError::Unauthorized(
            "Missing bearer session token".to_string(),
        ));
    };

    let session = store.session(token)?.ok_or_else(|| {
        tracing::warn!("Rejected unknown or expired session {}", token_prefix(token));
        ApiError::Unauthorized("Invalid or expired session".to_string())
    })?;

    tracing::debug!(
        "Session {} resolved to workspace {}",
        token_prefix(&session.token),
        session.workspace_id
    );
    request.extensions_mut().insert(RequestContext::from(session));
    Ok(next.run(request).await)
}

/// Create CORS middleware layer
///
/// The dashboard UI is served from a different origin, so every origin, method
/// and header is allowed. Preflight requests are answered by the layer.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
