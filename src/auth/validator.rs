// Startup credential validation

use reqwest::Method;
use thiserror::Error;

use super::types::{token_prefix, BotIdentity, IntegrationKind};
use crate::http_client::NotionHttpClient;
use crate::notion::models::{BotOwner, User};
use crate::notion::NotionError;

/// Reasons the server refuses to start
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configured Notion token was rejected: {0}")]
    InvalidToken(String),

    #[error("Notion API is unreachable: {0}")]
    Unreachable(String),

    #[error("Token does not belong to a bot user")]
    NotABot,

    #[error("No database titled '{0}' is shared with the integration")]
    MissingDatabase(&'static str),
}

/// Check a token against `/v1/users/me` and classify it
///
/// A bot owned by a user was created through the public OAuth flow; anything
/// else is treated as an internal integration token.
pub async fn verify_token(
    http: &NotionHttpClient,
    token: &str,
) -> Result<BotIdentity, StartupError> {
    tracing::info!("Verifying Notion token {}", token_prefix(token));

    let me: User = http
        .execute_json(http.authorized(Method::GET, "/v1/users/me", token))
        .await
        .map_err(|e| match e {
            NotionError::Api { .. } => StartupError::InvalidToken(e.to_string()),
            other => StartupError::Unreachable(other.to_string()),
        })?;

    let bot = me.bot.as_ref().ok_or(StartupError::NotABot)?;
    let kind = match bot.owner {
        Some(BotOwner::User { .. }) => IntegrationKind::Public,
        _ => IntegrationKind::Internal,
    };

    Ok(BotIdentity {
        bot_id: me.id.clone(),
        kind,
        workspace_name: bot.workspace_name.clone(),
    })
}
