// Client resolution: maps a request's tenant to an authenticated Notion handle

use dashmap::DashMap;
use std::sync::Arc;

use crate::auth::{Credential, CredentialStore, Session};
use crate::config::OperatingMode;
use crate::error::ApiError;
use crate::http_client::NotionHttpClient;
use crate::notion::NotionClient;

/// Tenant information attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub workspace_id: String,
    pub user_id: Option<String>,
    pub session_token: Option<String>,
}

impl RequestContext {
    pub fn for_workspace(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            user_id: None,
            session_token: None,
        }
    }
}

impl From<Session> for RequestContext {
    fn from(session: Session) -> Self {
        Self {
            workspace_id: session.workspace_id,
            user_id: session.user_id,
            session_token: Some(session.token),
        }
    }
}

/// One resolution operation shared by both operating modes
pub trait ResolveClient {
    fn resolve(&self, ctx: &RequestContext) -> Result<NotionClient, ApiError>;
}

/// Single workspace: every request gets the process-level credential
pub struct InternalClientResolver {
    client: NotionClient,
}

impl InternalClientResolver {
    pub fn new(http: Arc<NotionHttpClient>, credential: Credential) -> Self {
        Self {
            client: NotionClient::new(http, Arc::new(credential)),
        }
    }
}

impl ResolveClient for InternalClientResolver {
    fn resolve(&self, _ctx: &RequestContext) -> Result<NotionClient, ApiError> {
        Ok(self.client.clone())
    }
}

/// Multi-tenant: credentials are looked up by the session's workspace
///
/// Handles are cached per workspace; a fresh OAuth grant must call
/// [`PublicClientResolver::install`] so the next request picks up the new token.
pub struct PublicClientResolver {
    http: Arc<NotionHttpClient>,
    store: Arc<CredentialStore>,
    handles: DashMap<String, NotionClient>,
}

impl PublicClientResolver {
    pub fn new(http: Arc<NotionHttpClient>, store: Arc<CredentialStore>) -> Self {
        Self {
            http,
            store,
            handles: DashMap::new(),
        }
    }

    /// Replace the cached handle with one bound to a freshly stored credential
    ///
    /// Must run after the credential row is written. A miss that read the
    /// previous row concurrently then finds this handle and keeps it.
    pub fn install(&self, credential: Credential) {
        let workspace_id = credential.workspace_id.clone();
        let handle = NotionClient::new(self.http.clone(), Arc::new(credential));
        if self.handles.insert(workspace_id.clone(), handle).is_some() {
            tracing::debug!("Replaced cached client for workspace {}", workspace_id);
        }
    }

    /// Cache a handle built on a miss unless one landed first
    fn cache(&self, workspace_id: &str, handle: NotionClient) -> NotionClient {
        self.handles
            .entry(workspace_id.to_string())
            .or_insert(handle)
            .clone()
    }
}

impl ResolveClient for PublicClientResolver {
    fn resolve(&self, ctx: &RequestContext) -> Result<NotionClient, ApiError> {
        if let Some(handle) = self.handles.get(&ctx.workspace_id) {
            return Ok(handle.clone());
        }

        let credential = self.store.credential(&ctx.workspace_id)?.ok_or_else(|| {
            tracing::warn!("No credential stored for workspace {}", ctx.workspace_id);
            ApiError::CredentialNotFound(format!(
                "Workspace {} is not connected",
                ctx.workspace_id
            ))
        })?;

        let handle = NotionClient::new(self.http.clone(), Arc::new(credential));
        Ok(self.cache(&ctx.workspace_id, handle))
    }
}

/// Resolver selected once at startup from the operating mode
pub enum ClientResolver {
    Internal(InternalClientResolver),
    Public(PublicClientResolver),
}

impl ClientResolver {
    pub fn mode(&self) -> OperatingMode {
        match self {
            ClientResolver::Internal(_) => OperatingMode::Internal,
            ClientResolver::Public(_) => OperatingMode::Public,
        }
    }

    /// Bind a tenant to its newly stored credential (no-op in internal mode)
    pub fn install(&self, credential: Credential) {
        if let ClientResolver::Public(resolver) = self {
            resolver.install(credential);
        }
    }

    /// Handle for the internal workspace, used outside of a session
    pub fn internal_client(&self) -> Option<NotionClient> {
        match self {
            ClientResolver::Internal(resolver) => Some(resolver.client.clone()),
            ClientResolver::Public(_) => None,
        }
    }
}

impl ResolveClient for ClientResolver {
    fn resolve(&self, ctx: &RequestContext) -> Result<NotionClient, ApiError> {
        match self {
            ClientResolver::Internal(resolver) => resolver.resolve(ctx),
            ClientResolver::Public(resolver) => resolver.resolve(ctx),
        }
    }
}
