use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{
    exchange_code, Credential, CredentialStore, DatabaseBindings, OAuthClient, Session,
    INTERNAL_WORKSPACE_ID,
};
use crate::config::OperatingMode;
use crate::error::ApiError;
use crate::http_client::NotionHttpClient;
use crate::notion::{NotionClient, NotionError};
use crate::resolver::ClientResolver;

/// Body of `POST /api/login`, shaped by the operating mode
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LoginRequest {
    /// Public mode: the code returned by Notion's OAuth redirect
    OAuth {
        code: String,
        #[serde(default)]
        redirect_uri: Option<String>,
    },
    /// Internal mode: a workspace member's email address
    Email { email: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub workspace_id: String,
    pub workspace_name: Option<String>,
    pub user_id: Option<String>,
}

/// Issues sessions: OAuth connection in public mode, member lookup in internal mode
pub struct LoginService {
    resolver: Arc<ClientResolver>,
    store: Arc<CredentialStore>,
    http: Arc<NotionHttpClient>,
    oauth: Option<OAuthClient>,
    session_ttl: Duration,
}

impl LoginService {
    pub fn new(
        resolver: Arc<ClientResolver>,
        store: Arc<CredentialStore>,
        http: Arc<NotionHttpClient>,
        oauth: Option<OAuthClient>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            resolver,
            store,
            http,
            oauth,
            session_ttl,
        }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        match (self.resolver.mode(), request) {
            (OperatingMode::Public, LoginRequest::OAuth { code, redirect_uri }) => {
                self.connect_workspace(&code, redirect_uri.as_deref()).await
            }
            (OperatingMode::Internal, LoginRequest::Email { email }) => self.login_member(&email).await,
            (OperatingMode::Public, LoginRequest::Email { .. }) => Err(ApiError::ValidationFailed(
                "Public integration login expects an OAuth 'code'".to_string(),
            )),
            (OperatingMode::Internal, LoginRequest::OAuth { .. }) => Err(ApiError::ValidationFailed(
                "Internal integration login expects an 'email'".to_string(),
            )),
        }
    }

    /// Revoke a session; returns whether it was live
    pub fn logout(&self, token: &str) -> Result<bool, ApiError> {
        Ok(self.store.revoke_session(token)?)
    }

    async fn connect_workspace(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<LoginResponse, ApiError> {
        let oauth = self.oauth.as_ref().ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("OAuth client credentials are not configured"))
        })?;
        if code.trim().is_empty() {
            return Err(ApiError::ValidationFailed("code must not be empty".to_string()));
        }

        let grant = exchange_code(&self.http, oauth, code, redirect_uri)
            .await
            .map_err(|e| match e {
                NotionError::Api {
                    status: 400 | 401,
                    message,
                    ..
                } => ApiError::Unauthorized(format!("OAuth code was rejected: {}", message)),
                other => ApiError::from(other),
            })?;

        let mut credential = Credential {
            workspace_id: grant.workspace_id.clone(),
            access_token: grant.access_token.clone(),
            owner_reference: grant.owner_reference().to_string(),
            workspace_name: grant.workspace_name.clone(),
            databases: DatabaseBindings::default(),
        };

        let probe = NotionClient::new(self.http.clone(), Arc::new(credential.clone()));
        credential.databases = probe.discover_bindings(&DatabaseBindings::default()).await?;
        let missing = credential.databases.missing();
        if !missing.is_empty() {
            tracing::warn!(
                "Workspace {} connected without {} database(s)",
                credential.workspace_id,
                missing
                    .iter()
                    .map(|k| k.title())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        self.store.upsert_credential(&credential)?;
        self.resolver.install(credential.clone());
        tracing::info!(
            "Connected workspace {} ({})",
            credential.workspace_id,
            credential.workspace_name.as_deref().unwrap_or("unnamed")
        );

        let session = self.store.create_session(
            &credential.workspace_id,
            grant.owner_user_id(),
            self.session_ttl,
        )?;
        Ok(self.response(session, credential.workspace_name))
    }

    async fn login_member(&self, email: &str) -> Result<LoginResponse, ApiError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::ValidationFailed(format!(
                "'{}' is not an email address",
                email
            )));
        }

        let client = self.resolver.internal_client().ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("Internal client is not available"))
        })?;
        let users = client.list_users().await?;

        let member = users
            .iter()
            .find(|user| {
                user.email()
                    .map(|e| e.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                tracing::warn!("Login attempt for unknown member");
                ApiError::Unauthorized("No workspace member with that email".to_string())
            })?;

        tracing::info!("Member {} logged in", member.id);
        let session =
            self.store
                .create_session(INTERNAL_WORKSPACE_ID, Some(&member.id), self.session_ttl)?;
        Ok(self.response(session, client.credential().workspace_name.clone()))
    }

    fn response(&self, session: Session, workspace_name: Option<String>) -> LoginResponse {
        LoginResponse {
            token: session.token,
            token_type: "Bearer",
            expires_in: self.session_ttl.num_seconds(),
            workspace_id: session.workspace_id,
            workspace_name,
            user_id: session.user_id,
        }
    }
}
