use anyhow::{Context, Result};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::notion::NotionError;

/// Shared HTTP transport for the Notion API
///
/// One pooled `reqwest::Client` serves every credential; per-tenant handles
/// only add their own bearer token. Each call is a single attempt.
pub struct NotionHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API root, e.g. `https://api.notion.com`
    base_url: String,

    /// Value of the `Notion-Version` header
    api_version: String,
}

impl NotionHttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        api_version: &str,
        max_connections: usize,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        })
    }

    /// Absolute URL for an API path such as `/v1/users/me`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Request builder carrying the bearer token and version headers
    pub fn authorized(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(token)
            .header("Notion-Version", &self.api_version)
            .header("Accept", "application/json")
    }

    /// Execute a request once; non-2xx answers become `NotionError::Api`
    pub async fn execute(&self, request: Request) -> Result<Response, NotionError> {
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(method = %method, url = %url, "Sending Notion request");

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(status = %status, "Received Notion response");

                if status.is_success() {
                    return Ok(response);
                }

                let error_text = response.text().await.unwrap_or_default();
                tracing::warn!(
                    status = status.as_u16(),
                    method = %method,
                    url = %url,
                    response_body = %error_text,
                    "Notion request failed with error response"
                );
                Err(NotionError::from_body(status.as_u16(), &error_text))
            }
            Err(e) => {
                let err = NotionError::from_reqwest(&e);
                tracing::warn!(
                    error = %e,
                    error_debug = ?e,
                    method = %method,
                    url = %url,
                    "Notion request error"
                );
                Err(err)
            }
        }
    }

    /// Execute a request and decode its JSON body into `T`
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, NotionError> {
        let request = builder
            .build()
            .map_err(|e| NotionError::from_reqwest(&e))?;
        let response = self.execute(request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| NotionError::from_reqwest(&e))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "Notion response did not match the expected schema");
            NotionError::Decode(e.to_string())
        })
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}
