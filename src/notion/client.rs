use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use super::error::NotionError;
use super::models::{DatabaseSummary, ListResponse, NewPage, Page, PagePatch, User};
use crate::auth::{Credential, DatabaseBindings, DatabaseKind};
use crate::http_client::NotionHttpClient;

/// Page size requested from paginated endpoints
const PAGE_SIZE: u32 = 100;

/// Authenticated handle on the Notion API for exactly one credential
#[derive(Clone)]
pub struct NotionClient {
    http: Arc<NotionHttpClient>,
    credential: Arc<Credential>,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl NotionClient {
    pub fn new(http: Arc<NotionHttpClient>, credential: Arc<Credential>) -> Self {
        Self { http, credential }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn workspace_id(&self) -> &str {
        &self.credential.workspace_id
    }

    /// Whether both handles are bound to the very same credential instance
    #[cfg(test)]
    pub(crate) fn shares_credential(&self, other: &NotionClient) -> bool {
        Arc::ptr_eq(&self.credential, &other.credential)
    }

    /// Database bound to this tenant for a resource kind
    pub fn database_id(&self, kind: DatabaseKind) -> Option<&str> {
        self.credential.databases.get(kind)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, NotionError> {
        let builder = self
            .http
            .authorized(Method::GET, path, &self.credential.access_token);
        self.http.execute_json(builder).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, NotionError> {
        let builder = self
            .http
            .authorized(method, path, &self.credential.access_token)
            .json(body);
        self.http.execute_json(builder).await
    }

    /// `GET /v1/users/me`
    pub async fn me(&self) -> Result<User, NotionError> {
        self.get("/v1/users/me").await
    }

    /// All workspace users, following pagination
    pub async fn list_users(&self) -> Result<Vec<User>, NotionError> {
        let mut users = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut builder = self
                .http
                .authorized(Method::GET, "/v1/users", &self.credential.access_token)
                .query(&[("page_size", PAGE_SIZE.to_string())]);
            if let Some(c) = &cursor {
                builder = builder.query(&[("start_cursor", c)]);
            }

            let page: ListResponse<User> = self.http.execute_json(builder).await?;
            users.extend(page.results);

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(users)
    }

    /// `GET /v1/users/{id}`
    pub async fn retrieve_user(&self, user_id: &str) -> Result<User, NotionError> {
        self.get(&format!("/v1/users/{}", user_id)).await
    }

    /// Query a database, following pagination
    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
    ) -> Result<Vec<Page>, NotionError> {
        let path = format!("/v1/databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(f) = &filter {
                body["filter"] = f.clone();
            }
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let batch: ListResponse<Page> = self.send(Method::POST, &path, &body).await?;
            pages.extend(batch.results);

            match (batch.has_more, batch.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(
            database_id = database_id,
            count = pages.len(),
            "Queried database"
        );
        Ok(pages)
    }

    /// `GET /v1/pages/{id}`
    pub async fn retrieve_page(&self, page_id: &str) -> Result<Page, NotionError> {
        self.get(&format!("/v1/pages/{}", page_id)).await
    }

    /// `PATCH /v1/pages/{id}`
    pub async fn update_page(&self, page_id: &str, patch: &PagePatch) -> Result<Page, NotionError> {
        self.send(Method::PATCH, &format!("/v1/pages/{}", page_id), patch)
            .await
    }

    /// `POST /v1/pages`
    pub async fn create_page(&self, page: &NewPage) -> Result<Page, NotionError> {
        self.send(Method::POST, "/v1/pages", page).await
    }

    /// Every database shared with the integration
    pub async fn search_databases(&self) -> Result<Vec<DatabaseSummary>, NotionError> {
        let mut databases = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": {"property": "object", "value": "database"},
                "page_size": PAGE_SIZE,
            });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let batch: ListResponse<DatabaseSummary> =
                self.send(Method::POST, "/v1/search", &body).await?;
            databases.extend(batch.results);

            match (batch.has_more, batch.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(databases)
    }

    /// Fill the missing bindings by matching shared database titles
    pub async fn discover_bindings(
        &self,
        known: &DatabaseBindings,
    ) -> Result<DatabaseBindings, NotionError> {
        let mut bindings = known.clone();
        let missing = bindings.missing();
        if missing.is_empty() {
            return Ok(bindings);
        }

        let databases = self.search_databases().await?;
        for kind in missing {
            let found = databases
                .iter()
                .find(|db| db.title_text().trim().eq_ignore_ascii_case(kind.title()));
            match found {
                Some(db) => {
                    tracing::info!("Discovered {} database: {}", kind, db.id);
                    bindings.set(kind, db.id.clone());
                }
                None => tracing::warn!("No database titled '{}' shared with workspace {}", kind.title(), self.workspace_id()),
            }
        }

        Ok(bindings)
    }
}
