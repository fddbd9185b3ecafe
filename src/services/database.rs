use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{check_patch, check_schema, parse_id, same_id, Schema};
use crate::auth::DatabaseKind;
use crate::error::ApiError;
use crate::notion::models::{Page, PagePatch};
use crate::notion::NotionClient;
use crate::resolver::{ClientResolver, RequestContext, ResolveClient};

/// A page type stored in one of the tenant's bound databases
pub trait Resource: Send + Sync + 'static {
    /// Which binding holds this resource's pages
    const KIND: DatabaseKind;

    /// Singular name used in error messages
    const NAME: &'static str;

    /// Properties every page must carry, with their remote type
    const SCHEMA: Schema;

    /// Typed list filter accepted from the HTTP layer
    type Filter: Default + Send + Sync;

    /// Remote query filter, `None` for an unfiltered query
    fn filter(filter: &Self::Filter) -> Option<Value>;
}

/// `list` / `get` / `update` over the database bound to `R`
pub struct DatabaseService<R: Resource> {
    resolver: Arc<ClientResolver>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> DatabaseService<R> {
    pub fn new(resolver: Arc<ClientResolver>) -> Self {
        Self {
            resolver,
            _resource: PhantomData,
        }
    }

    /// Tenant handle plus the id of the database bound to `R`
    pub(crate) fn bound_client(&self, ctx: &RequestContext) -> Result<(NotionClient, String), ApiError> {
        let client = self.resolver.resolve(ctx)?;
        let database_id = client
            .database_id(R::KIND)
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No {} database is connected for workspace {}",
                    R::KIND,
                    ctx.workspace_id
                ))
            })?;
        Ok((client, database_id))
    }

    pub async fn list(&self, ctx: &RequestContext, filter: &R::Filter) -> Result<Vec<Page>, ApiError> {
        let (client, database_id) = self.bound_client(ctx)?;
        let pages = client.query_database(&database_id, R::filter(filter)).await?;

        for page in &pages {
            check_schema(R::NAME, R::SCHEMA, page)?;
        }
        Ok(pages)
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Page, ApiError> {
        let (client, database_id) = self.bound_client(ctx)?;
        self.fetch(&client, &database_id, id).await
    }

    pub async fn update(&self, ctx: &RequestContext, id: &str, patch: &PagePatch) -> Result<Page, ApiError> {
        check_patch(R::NAME, R::SCHEMA, patch)?;
        let (client, database_id) = self.bound_client(ctx)?;

        // Membership check keeps a patch from landing on a page of another database
        let existing = self.fetch(&client, &database_id, id).await?;

        tracing::debug!(
            "Updating {} {} ({} properties)",
            R::NAME,
            existing.id,
            patch.properties.len()
        );
        let updated = client.update_page(&existing.id, patch).await?;
        check_schema(R::NAME, R::SCHEMA, &updated)?;
        Ok(updated)
    }

    async fn fetch(&self, client: &NotionClient, database_id: &str, id: &str) -> Result<Page, ApiError> {
        let id = parse_id(id)?;
        let page = client.retrieve_page(&id).await?;

        let belongs = page
            .database_id()
            .map(|parent| same_id(parent, database_id))
            .unwrap_or(false);
        if !belongs || page.archived {
            return Err(ApiError::NotFound(format!("No {} with id '{}'", R::NAME, id)));
        }

        check_schema(R::NAME, R::SCHEMA, &page)?;
        Ok(page)
    }
}
