use std::sync::Arc;

use super::parse_id;
use crate::error::ApiError;
use crate::notion::models::User;
use crate::resolver::{ClientResolver, RequestContext, ResolveClient};

/// Workspace members and the integration's own bot user
pub struct UsersService {
    resolver: Arc<ClientResolver>,
}

impl UsersService {
    pub fn new(resolver: Arc<ClientResolver>) -> Self {
        Self { resolver }
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<User>, ApiError> {
        let client = self.resolver.resolve(ctx)?;
        Ok(client.list_users().await?)
    }

    /// The bot user behind the tenant's credential
    pub async fn me(&self, ctx: &RequestContext) -> Result<User, ApiError> {
        let client = self.resolver.resolve(ctx)?;
        Ok(client.me().await?)
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<User, ApiError> {
        let id = parse_id(id)?;
        let client = self.resolver.resolve(ctx)?;
        Ok(client.retrieve_user(&id).await?)
    }
}
