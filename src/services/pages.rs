use std::sync::Arc;

use super::parse_id;
use crate::error::ApiError;
use crate::notion::models::{Page, PagePatch};
use crate::resolver::{ClientResolver, RequestContext, ResolveClient};

/// Untyped access to any page shared with the integration
pub struct PagesService {
    resolver: Arc<ClientResolver>,
}

impl PagesService {
    pub fn new(resolver: Arc<ClientResolver>) -> Self {
        Self { resolver }
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Page, ApiError> {
        let id = parse_id(id)?;
        let client = self.resolver.resolve(ctx)?;
        Ok(client.retrieve_page(&id).await?)
    }

    pub async fn update(&self, ctx: &RequestContext, id: &str, patch: &PagePatch) -> Result<Page, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::ValidationFailed(
                "Patch must change at least one property".to_string(),
            ));
        }
        let id = parse_id(id)?;
        let client = self.resolver.resolve(ctx)?;

        tracing::debug!("Patching page {} ({} properties)", id, patch.properties.len());
        Ok(client.update_page(&id, patch).await?)
    }
}
