// Startup wiring: credential check, bindings, store and the router

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{
    token_prefix, verify_token, Credential, CredentialStore, DatabaseBindings, IntegrationKind,
    StartupError, INTERNAL_WORKSPACE_ID,
};
use crate::config::{Config, OperatingMode};
use crate::http_client::NotionHttpClient;
use crate::middleware;
use crate::notion::NotionClient;
use crate::resolver::{ClientResolver, InternalClientResolver, PublicClientResolver};
use crate::routes::{self, AppState, ServerStatus};

/// Verify the configured credential and build the application state
///
/// Any error here is fatal: the caller must not bind its listener.
pub async fn bootstrap(config: &Config) -> Result<AppState> {
    let http = Arc::new(NotionHttpClient::new(
        &config.notion_base_url,
        &config.notion_api_version,
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);
    tracing::info!("HTTP client initialized with connection pooling");

    let identity = verify_token(&http, &config.notion_api_key).await?;
    tracing::info!(
        "Running with {} access token {} (bot {})",
        match identity.kind {
            IntegrationKind::Internal => "internal",
            IntegrationKind::Public => "public",
        },
        token_prefix(&config.notion_api_key),
        identity.bot_id
    );

    let mut credential = Credential {
        workspace_id: INTERNAL_WORKSPACE_ID.to_string(),
        access_token: config.notion_api_key.clone(),
        owner_reference: identity.bot_id.clone(),
        workspace_name: identity.workspace_name.clone(),
        databases: DatabaseBindings {
            projects: config.projects_db.clone(),
            people: config.people_db.clone(),
            timereports: config.timereports_db.clone(),
        },
    };

    let (store, resolver) = match config.mode {
        OperatingMode::Internal => {
            let probe = NotionClient::new(http.clone(), Arc::new(credential.clone()));
            credential.databases = probe
                .discover_bindings(&credential.databases)
                .await
                .context("Failed to discover the workspace databases")?;
            if let Some(kind) = credential.databases.missing().first() {
                return Err(StartupError::MissingDatabase(kind.title()).into());
            }
            tracing::info!("Database bindings: {:?}", credential.databases);

            // Sessions only need to outlive the process in public mode
            let store = Arc::new(CredentialStore::open_in_memory()?);
            let resolver =
                ClientResolver::Internal(InternalClientResolver::new(http.clone(), credential));
            (store, resolver)
        }
        OperatingMode::Public => {
            let store = Arc::new(
                CredentialStore::open(&config.db_file).with_context(|| {
                    format!("Failed to open credential store {}", config.db_file.display())
                })?,
            );
            let purged = store.purge_expired_sessions()?;
            tracing::info!(
                "Credential store ready: {} connected workspace(s), {} expired session(s) purged",
                store.credential_count()?,
                purged
            );
            let resolver = ClientResolver::Public(PublicClientResolver::new(http.clone(), store.clone()));
            (store, resolver)
        }
    };

    let status = ServerStatus {
        integration_type: config.mode,
        valid_internal_token: true,
        token_kind: Some(identity.kind),
        client_id: config.oauth_client_id.clone(),
    };

    Ok(AppState::new(
        Arc::new(config.clone()),
        status,
        store,
        resolver,
        http,
    ))
}

/// Build the application with all routes and middleware
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::public_routes(state.clone()))
        .merge(routes::api_routes(state))
        // Outermost first on the way in: trace, compression, CORS
        .layer(middleware::cors_layer())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Print startup banner
pub fn print_startup_banner(config: &Config) {
    let banner = r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║                   Notion Timesheet                        ║
║                                                           ║
║   Projects, people and time reports from Notion           ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner);
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:      http://{}:{}",
        config.server_host, config.server_port
    );
    println!("  Integration: {}", config.mode);
    println!("  Notion API:  {} ({})", config.notion_base_url, config.notion_api_version);
    if config.mode == OperatingMode::Public {
        println!("  Store:       {}", config.db_file.display());
    }
    println!("  Log Level:   {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
