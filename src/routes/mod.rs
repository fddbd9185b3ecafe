use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    middleware::{self as axum_middleware},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{CredentialStore, IntegrationKind, OAuthClient};
use crate::config::{Config, OperatingMode};
use crate::error::ApiError;
use crate::http_client::NotionHttpClient;
use crate::middleware;
use crate::notion::models::{ListResponse, Page, PagePatch, User};
use crate::resolver::{ClientResolver, RequestContext};
use crate::services::{
    LoginRequest, LoginResponse, LoginService, NewTimeReport, PagesService, PeopleService,
    ProjectFilter, ProjectPatch, ProjectsService, TimeReportFilter, TimeReportsService,
    UsersService,
};

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of the startup checks, served by `/api/status`
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub integration_type: OperatingMode,
    pub valid_internal_token: bool,
    pub token_kind: Option<IntegrationKind>,
    pub client_id: Option<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub status: Arc<ServerStatus>,
    pub store: Arc<CredentialStore>,
    pub resolver: Arc<ClientResolver>,
    pub projects: Arc<ProjectsService>,
    pub people: Arc<PeopleService>,
    pub timereports: Arc<TimeReportsService>,
    pub users: Arc<UsersService>,
    pub pages: Arc<PagesService>,
    pub login: Arc<LoginService>,
}

impl AppState {
    /// Wire every service to the one resolver
    pub fn new(
        config: Arc<Config>,
        status: ServerStatus,
        store: Arc<CredentialStore>,
        resolver: ClientResolver,
        http: Arc<NotionHttpClient>,
    ) -> Self {
        let resolver = Arc::new(resolver);
        let oauth = match (&config.oauth_client_id, &config.oauth_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                redirect_uri: config.oauth_redirect_uri.clone(),
            }),
            _ => None,
        };
        let session_ttl = config.session_duration();

        Self {
            status: Arc::new(status),
            projects: Arc::new(ProjectsService::new(resolver.clone())),
            people: Arc::new(PeopleService::new(resolver.clone())),
            timereports: Arc::new(TimeReportsService::new(resolver.clone())),
            users: Arc::new(UsersService::new(resolver.clone())),
            pages: Arc::new(PagesService::new(resolver.clone())),
            login: Arc::new(LoginService::new(
                resolver.clone(),
                store.clone(),
                http,
                oauth,
                session_ttl,
            )),
            resolver,
            store,
            config,
        }
    }
}

/// Health check routes (no authentication required)
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// Login, status and OAuth bootstrap routes (no session required)
pub fn public_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/clientId", get(client_id_handler))
        .route("/api/login", post(login_handler))
        .with_state(state)
}

/// Resource routes (require a session)
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/logout", post(logout_handler))
        .route("/api/projects", get(list_projects_handler))
        .route(
            "/api/projects/:id",
            get(get_project_handler).patch(update_project_handler),
        )
        .route("/api/people", get(list_people_handler))
        .route("/api/people/:id", get(get_person_handler))
        .route(
            "/api/timereports",
            get(list_timereports_handler).post(create_timereport_handler),
        )
        .route("/api/timereports/:id", get(get_timereport_handler))
        .route("/api/users", get(list_users_handler))
        .route("/api/users/me", get(me_handler))
        .route("/api/users/:id", get(get_user_handler))
        .route(
            "/api/pages/:id",
            get(get_page_handler).patch(update_page_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.store.clone(),
            middleware::session_middleware,
        ))
        .with_state(state)
}

/// GET / - Simple health check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Notion timesheet server is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// GET /api/status - operating mode and startup credential check
async fn status_handler(State(state): State<AppState>) -> Json<ServerStatus> {
    Json(state.status.as_ref().clone())
}

/// GET /api/clientId - OAuth client id for the authorize URL, as plain text
async fn client_id_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .status
        .client_id
        .clone()
        .ok_or_else(|| ApiError::NotFound("No OAuth client id is configured".to_string()))
}

/// POST /api/login
async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    tracing::info!("Login request ({} integration)", state.status.integration_type);
    Ok(Json(state.login.login(request).await?))
}

/// POST /api/logout
async fn logout_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = ctx.session_token.as_deref() {
        state.login.logout(token)?;
    }
    tracing::info!("Session closed for workspace {}", ctx.workspace_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_projects_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    query: Result<Query<ProjectFilter>, QueryRejection>,
) -> Result<Json<ListResponse<Page>>, ApiError> {
    let Query(filter) = query?;
    tracing::info!(
        "Request to /api/projects: status={}",
        filter.status.as_deref().unwrap_or("*")
    );
    let pages = state.projects.list(&ctx, &filter).await?;
    Ok(Json(ListResponse::complete(pages)))
}

async fn get_project_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.projects.get(&ctx, &id).await?))
}

/// PATCH /api/projects/:id - change Status and/or Hours
async fn update_project_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<ProjectPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(patch) = payload?;
    let patch = PagePatch::try_from(patch)?;
    tracing::info!("Request to PATCH /api/projects/{}", id);
    let page = state.projects.update(&ctx, &id, &patch).await?;

    let name = page.property("Projectname").and_then(|p| p.plain_text());
    tracing::info!(
        "Project '{}' now {} with {} hours",
        name.as_deref().unwrap_or(&page.id),
        page.property("Status")
            .and_then(|p| p.select_name())
            .unwrap_or("no status"),
        page.property("Hours")
            .and_then(|p| p.number())
            .map_or_else(|| "unset".to_string(), |h| h.to_string())
    );
    Ok(Json(page))
}

async fn list_people_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ListResponse<Page>>, ApiError> {
    tracing::info!("Request to /api/people");
    let pages = state.people.list(&ctx, &()).await?;
    Ok(Json(ListResponse::complete(pages)))
}

async fn get_person_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.people.get(&ctx, &id).await?))
}

#[derive(Debug, Default, Deserialize)]
struct TimeReportQuery {
    person: Option<String>,
    project: Option<String>,
    #[serde(default)]
    collated: bool,
}

/// GET /api/timereports - optionally collated with related people and projects
async fn list_timereports_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    query: Result<Query<TimeReportQuery>, QueryRejection>,
) -> Result<Json<ListResponse<Page>>, ApiError> {
    let Query(query) = query?;
    let filter = TimeReportFilter::new(query.person.as_deref(), query.project.as_deref())?;
    tracing::info!("Request to /api/timereports: collated={}", query.collated);

    let pages = if query.collated {
        state.timereports.list_collated(&ctx, &filter).await?
    } else {
        state.timereports.list(&ctx, &filter).await?
    };
    Ok(Json(ListResponse::complete(pages)))
}

async fn get_timereport_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.timereports.get(&ctx, &id).await?))
}

async fn create_timereport_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<NewTimeReport>, JsonRejection>,
) -> Result<(StatusCode, Json<Page>), ApiError> {
    let Json(report) = payload?;
    let page = state.timereports.create(&ctx, report).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn list_users_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ListResponse<User>>, ApiError> {
    let users = state.users.list(&ctx).await?;
    Ok(Json(ListResponse::complete(users)))
}

async fn me_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.me(&ctx).await?))
}

async fn get_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get(&ctx, &id).await?))
}

async fn get_page_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.pages.get(&ctx, &id).await?))
}

/// PATCH /api/pages/:id - generic property patch in the remote write format
async fn update_page_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<PagePatch>, JsonRejection>,
) -> Result<Json<Page>, ApiError> {
    let Json(patch) = payload?;
    tracing::info!("Request to PATCH /api/pages/{}", id);
    Ok(Json(state.pages.update(&ctx, &id, &patch).await?))
}
