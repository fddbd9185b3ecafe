// Public integration OAuth code exchange

use serde::{Deserialize, Serialize};

use crate::http_client::NotionHttpClient;
use crate::notion::models::BotOwner;
use crate::notion::NotionError;

/// OAuth client registered for the public integration
#[derive(Clone, Debug)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

/// Response of `POST /v1/oauth/token`
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthGrant {
    pub access_token: String,
    pub bot_id: String,
    pub workspace_id: String,
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default)]
    pub owner: Option<BotOwner>,
}

impl OAuthGrant {
    /// User who granted access, when the owner is a user
    pub fn owner_user_id(&self) -> Option<&str> {
        match &self.owner {
            Some(BotOwner::User { user: Some(user) }) => Some(user.id.as_str()),
            _ => None,
        }
    }

    /// Owning user id, falling back to the bot id
    pub fn owner_reference(&self) -> &str {
        self.owner_user_id().unwrap_or(&self.bot_id)
    }
}

/// Exchange an authorization code for a workspace access token
pub async fn exchange_code(
    http: &NotionHttpClient,
    oauth: &OAuthClient,
    code: &str,
    redirect_uri: Option<&str>,
) -> Result<OAuthGrant, NotionError> {
    tracing::info!("Exchanging OAuth authorization code");

    let body = TokenRequest {
        grant_type: "authorization_code",
        code,
        redirect_uri: redirect_uri.or(oauth.redirect_uri.as_deref()),
    };

    let builder = http
        .client()
        .post(http.url("/v1/oauth/token"))
        .basic_auth(&oauth.client_id, Some(&oauth.client_secret))
        .header("Notion-Version", http.api_version())
        .json(&body);

    let grant: OAuthGrant = http.execute_json(builder).await?;
    tracing::info!(
        "OAuth grant received for workspace {} ({})",
        grant.workspace_id,
        grant.workspace_name.as_deref().unwrap_or("unnamed")
    );
    Ok(grant)
}
