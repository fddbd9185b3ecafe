//! In-process fake of the Notion API for end-to-end tests.
//!
//! Holds pages in memory, applies patches in the write format and serves them
//! back in the read format, so write-then-read round trips can be observed.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A workspace known to the fake: its token and the databases shared with it
#[derive(Clone, Debug)]
pub struct FakeWorkspace {
    pub workspace_id: String,
    pub token: String,
    pub databases: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakeState {
    pub workspaces: Mutex<Vec<FakeWorkspace>>,
    pub pages: Mutex<HashMap<String, Value>>,
    pub users: Mutex<Vec<Value>>,
    /// OAuth code -> workspace id
    pub oauth_codes: Mutex<HashMap<String, String>>,
    /// Page id -> number of `GET /v1/pages/{id}` calls
    pub page_reads: Mutex<HashMap<String, usize>>,
}

impl FakeState {
    pub fn add_workspace(&self, workspace_id: &str, token: &str, databases: &[(&str, &str)]) {
        self.workspaces.lock().unwrap().push(FakeWorkspace {
            workspace_id: workspace_id.to_string(),
            token: token.to_string(),
            databases: databases
                .iter()
                .map(|(id, title)| (id.to_string(), title.to_string()))
                .collect(),
        });
    }

    pub fn add_page(&self, database_id: &str, id: &str, properties: Value) {
        self.pages.lock().unwrap().insert(
            id.to_string(),
            json!({
                "object": "page",
                "id": id,
                "archived": false,
                "parent": {"type": "database_id", "database_id": database_id},
                "properties": properties,
            }),
        );
    }

    pub fn add_user(&self, user: Value) {
        self.users.lock().unwrap().push(user);
    }

    pub fn add_oauth_code(&self, code: &str, workspace_id: &str) {
        self.oauth_codes
            .lock()
            .unwrap()
            .insert(code.to_string(), workspace_id.to_string());
    }

    pub fn page(&self, id: &str) -> Option<Value> {
        self.pages.lock().unwrap().get(id).cloned()
    }

    pub fn reads_of(&self, id: &str) -> usize {
        self.page_reads.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    fn workspace_for(&self, headers: &HeaderMap) -> Option<FakeWorkspace> {
        let token = headers
            .get("authorization")?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.workspaces
            .lock()
            .unwrap()
            .iter()
            .find(|ws| ws.token == token)
            .cloned()
    }
}

/// Fake Notion server bound to an ephemeral port
pub struct FakeNotionServer {
    pub state: Arc<FakeState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    port: u16,
}

impl FakeNotionServer {
    pub async fn start(state: FakeState) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let state = Arc::new(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let app = Router::new()
            .route("/v1/users/me", get(me))
            .route("/v1/users", get(list_users))
            .route("/v1/users/:id", get(retrieve_user))
            .route("/v1/search", post(search))
            .route("/v1/databases/:id/query", post(query_database))
            .route("/v1/pages", post(create_page))
            .route("/v1/pages/:id", get(retrieve_page).patch(update_page))
            .route("/v1/oauth/token", post(oauth_token))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            state,
            shutdown_tx: Some(shutdown_tx),
            port,
        })
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for FakeNotionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "object": "error",
            "status": status.as_u16(),
            "code": code,
            "message": message,
        })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "unauthorized", "API token is invalid.")
}

fn not_found(id: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        "object_not_found",
        &format!("Could not find object with ID: {}.", id),
    )
}

fn list(results: Vec<Value>) -> Response {
    Json(json!({
        "object": "list",
        "results": results,
        "next_cursor": null,
        "has_more": false,
    }))
    .into_response()
}

fn same_id(a: &str, b: &str) -> bool {
    a.replace('-', "").eq_ignore_ascii_case(&b.replace('-', ""))
}

fn page_database(page: &Value) -> Option<&str> {
    page["parent"]["database_id"].as_str()
}

fn can_read(ws: &FakeWorkspace, database_id: &str) -> bool {
    ws.databases.iter().any(|(id, _)| same_id(id, database_id))
}

async fn me(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let Some(ws) = state.workspace_for(&headers) else {
        return unauthorized();
    };
    Json(json!({
        "object": "user",
        "id": format!("bot-{}", ws.workspace_id),
        "type": "bot",
        "name": "Timesheet",
        "bot": {
            "owner": {"type": "workspace", "workspace": true},
            "workspace_name": format!("Workspace {}", ws.workspace_id),
        }
    }))
    .into_response()
}

async fn list_users(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if state.workspace_for(&headers).is_none() {
        return unauthorized();
    }
    list(state.users.lock().unwrap().clone())
}

async fn retrieve_user(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if state.workspace_for(&headers).is_none() {
        return unauthorized();
    }
    let users = state.users.lock().unwrap();
    match users.iter().find(|u| same_id(u["id"].as_str().unwrap_or_default(), &id)) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found(&id),
    }
}

async fn search(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let Some(ws) = state.workspace_for(&headers) else {
        return unauthorized();
    };
    let results = ws
        .databases
        .iter()
        .map(|(id, title)| {
            json!({
                "object": "database",
                "id": id,
                "title": [{"type": "text", "text": {"content": title}, "plain_text": title}]
            })
        })
        .collect();
    list(results)
}

fn matches_filter(page: &Value, filter: &Value) -> bool {
    if let Some(clauses) = filter["and"].as_array() {
        return clauses.iter().all(|c| matches_filter(page, c));
    }
    let Some(property) = filter["property"].as_str() else {
        return true;
    };
    let prop = &page["properties"][property];

    if let Some(expected) = filter["select"]["equals"].as_str() {
        return prop["select"]["name"].as_str() == Some(expected);
    }
    if let Some(expected) = filter["relation"]["contains"].as_str() {
        return prop["relation"]
            .as_array()
            .map(|refs| {
                refs.iter()
                    .any(|r| same_id(r["id"].as_str().unwrap_or_default(), expected))
            })
            .unwrap_or(false);
    }
    true
}

async fn query_database(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(database_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(ws) = state.workspace_for(&headers) else {
        return unauthorized();
    };
    if !can_read(&ws, &database_id) {
        return not_found(&database_id);
    }

    let pages = state.pages.lock().unwrap();
    let mut results: Vec<Value> = pages
        .values()
        .filter(|p| page_database(p).map(|db| same_id(db, &database_id)).unwrap_or(false))
        .filter(|p| !p["archived"].as_bool().unwrap_or(false))
        .filter(|p| body.get("filter").map(|f| matches_filter(p, f)).unwrap_or(true))
        .cloned()
        .collect();
    results.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
    list(results)
}

async fn retrieve_page(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let Some(ws) = state.workspace_for(&headers) else {
        return unauthorized();
    };
    *state.page_reads.lock().unwrap().entry(id.clone()).or_insert(0) += 1;

    let pages = state.pages.lock().unwrap();
    match pages.get(&id) {
        Some(page) if page_database(page).map(|db| can_read(&ws, db)).unwrap_or(false) => {
            Json(page.clone()).into_response()
        }
        _ => not_found(&id),
    }
}

/// Turn a write-format property (`{"select": {...}}`) into the read format
fn read_format(write: &Value) -> Option<Value> {
    let (kind, value) = write.as_object()?.iter().next()?;
    let value = if kind == "title" || kind == "rich_text" {
        Value::Array(
            value
                .as_array()
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|mut part| {
                    let text = part["text"]["content"].clone();
                    part["plain_text"] = text;
                    part
                })
                .collect(),
        )
    } else {
        value.clone()
    };
    let mut read = serde_json::Map::new();
    read.insert("type".to_string(), json!(kind));
    read.insert(kind.clone(), value);
    Some(Value::Object(read))
}

async fn update_page(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(ws) = state.workspace_for(&headers) else {
        return unauthorized();
    };
    let mut pages = state.pages.lock().unwrap();
    let Some(page) = pages.get_mut(&id) else {
        return not_found(&id);
    };
    if !page_database(page).map(|db| can_read(&ws, db)).unwrap_or(false) {
        return not_found(&id);
    }

    if let Some(props) = body["properties"].as_object() {
        for (name, write) in props {
            let Some(mut value) = read_format(write) else {
                return error(StatusCode::BAD_REQUEST, "validation_error", "bad property");
            };
            if let Some(existing_id) = page["properties"][name]["id"].as_str() {
                value["id"] = json!(existing_id);
            }
            page["properties"][name] = value;
        }
    }
    if let Some(archived) = body["archived"].as_bool() {
        page["archived"] = json!(archived);
    }
    Json(page.clone()).into_response()
}

async fn create_page(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(ws) = state.workspace_for(&headers) else {
        return unauthorized();
    };
    let Some(database_id) = body["parent"]["database_id"].as_str() else {
        return error(StatusCode::BAD_REQUEST, "validation_error", "parent required");
    };
    if !can_read(&ws, database_id) {
        return not_found(database_id);
    }

    let mut properties = serde_json::Map::new();
    for (name, write) in body["properties"].as_object().cloned().unwrap_or_default() {
        if let Some(value) = read_format(&write) {
            properties.insert(name, value);
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    state.add_page(database_id, &id, Value::Object(properties));
    match state.page(&id) {
        Some(page) => (StatusCode::OK, Json(page)).into_response(),
        None => not_found(&id),
    }
}

async fn oauth_token(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    let code = body["code"].as_str().unwrap_or_default();
    let Some(workspace_id) = state.oauth_codes.lock().unwrap().get(code).cloned() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response();
    };
    let token = state
        .workspaces
        .lock()
        .unwrap()
        .iter()
        .find(|ws| ws.workspace_id == workspace_id)
        .map(|ws| ws.token.clone())
        .unwrap_or_default();

    Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "bot_id": format!("bot-{}", workspace_id),
        "workspace_id": workspace_id,
        "workspace_name": format!("Workspace {}", workspace_id),
        "owner": {"type": "user", "user": {"object": "user", "id": format!("owner-{}", workspace_id)}}
    }))
    .into_response()
}
