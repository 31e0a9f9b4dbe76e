//! HTTP server: REST API, JSON tool API, widget, and MCP transports.
//!
//! Every route reads the same immutable dataset through one [`ToolContext`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status, version, facility count, live sessions |
//! | `GET`  | `/api/search?query=&maxResults=` | Free-text search |
//! | `GET`  | `/api/facility/{id}` | One facility |
//! | `GET`  | `/api/filter?province=&city=&facilityType=&limit=` | Structured filter |
//! | `GET`  | `/api/types` | Distinct facility types |
//! | `GET`  | `/api/provinces` | Provinces with counts |
//! | `GET`  | `/api/stats` | Dataset statistics |
//! | `GET`  | `/tools/list` | Registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool, `{ "result": ... }` |
//! | `GET`  | `/widget` | Inlined widget document |
//! | `GET`  | `/widget/{*file}` | Widget bundle files |
//! | `*`    | `/mcp` | MCP Streamable HTTP transport |
//! | `GET`  | `/sse` | MCP SSE transport stream |
//! | `POST` | `/messages?sessionId=` | MCP SSE transport messages |
//!
//! # Error Contract
//!
//! REST and tool errors share one body shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Query parameter \"query\" is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `tool_error` (500),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser widgets and
//! hosted MCP clients can call the server directly.

use axum::{
    extract::{FromRef, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rmcp::transport::streamable_http_server::{
    session::{local::LocalSessionManager, SessionManager},
    StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use odcaf_core::query::FilterCriteria;
use odcaf_core::{DatasetIndex, QueryError};

use crate::config::Config;
use crate::mcp::McpBridge;
use crate::output::ToolOutput;
use crate::sse::{self, SseSessions, SseState};
use crate::traits::{validate_params, ToolContext, ToolInfo, ToolRegistry};
use crate::widget::{missing_bundle_message, render_widget_html, WIDGET_MIME};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    ctx: ToolContext,
    tools: Arc<ToolRegistry>,
    bridge: McpBridge,
    sse_sessions: SseSessions,
    mcp_sessions: Arc<LocalSessionManager>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, index: Arc<DatasetIndex>) -> Self {
        let ctx = ToolContext::new(index, config.limits.clone());
        let tools = Arc::new(ToolRegistry::with_builtins(&config.limits));
        let bridge = McpBridge::new(ctx.clone(), tools.clone(), config.widget.dist_dir.clone());
        Self {
            config: Arc::new(config),
            ctx,
            tools,
            bridge,
            sse_sessions: SseSessions::new(),
            mcp_sessions: Arc::new(LocalSessionManager::default()),
            started_at: Utc::now(),
        }
    }

    async fn streamable_session_count(&self) -> usize {
        self.mcp_sessions.sessions.read().await.len()
    }

    async fn close_streamable_sessions(&self) {
        let ids: Vec<_> = self.mcp_sessions.sessions.read().await.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.mcp_sessions.close_session(&id).await {
                tracing::warn!(session = %id, error = %e, "failed to close MCP session");
            }
        }
    }
}

impl FromRef<AppState> for SseState {
    fn from_ref(state: &AppState) -> Self {
        SseState {
            bridge: state.bridge.clone(),
            sessions: state.sse_sessions.clone(),
        }
    }
}

/// Build the full router over `state`.
pub fn build_router(state: AppState) -> Router {
    let bridge = state.bridge.clone();
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        state.mcp_sessions.clone(),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/search", get(handle_api_search))
        .route("/api/facility/{id}", get(handle_api_facility))
        .route("/api/filter", get(handle_api_filter))
        .route("/api/types", get(handle_api_types))
        .route("/api/provinces", get(handle_api_provinces))
        .route("/api/stats", get(handle_api_stats))
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/widget", get(handle_widget))
        .route("/widget/{*file}", get(handle_widget_asset))
        .route("/sse", get(sse::handle_sse))
        .route(sse::MESSAGES_PATH, post(sse::handle_message))
        .nest_service("/mcp", mcp_service)
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server and blocks until Ctrl-C / SIGTERM.
pub async fn run_server(config: &Config, index: Arc<DatasetIndex>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind_addr();
    let base_url = config.server.base_url();
    let facilities = index.len();

    let state = AppState::new(config.clone(), index);
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(addr = %bind_addr, facilities, "ODCAF server listening");
    tracing::info!("REST API:        {}/api/search?query=museum", base_url);
    tracing::info!("MCP (streamable): {}/mcp", base_url);
    tracing::info!("MCP (SSE):       {}/sse", base_url);
    tracing::info!("Widget:          {}/widget", base_url);
    for t in state.tools.tools() {
        tracing::debug!(tool = t.name(), "registered tool");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
    state.sse_sessions.close_all().await;
    state.close_streamable_sessions().await;
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidInput(_) => bad_request(err.to_string()),
            QueryError::NotFound(_) => not_found(err.to_string()),
        }
    }
}

/// Map a tool failure to a status: typed query errors keep their meaning,
/// anything else is a 500.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    match err.downcast_ref::<QueryError>() {
        Some(query_err) => {
            let mut e = AppError::from(query_err.clone());
            e.message = format!("{}: {}", tool_name, e.message);
            e
        }
        None => {
            tracing::warn!(tool = tool_name, error = %err, "tool execution failed");
            tool_error(format!("{}: {}", tool_name, err))
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server: &'static str,
    version: &'static str,
    facilities: usize,
    started_at: DateTime<Utc>,
    transports: TransportCounts,
}

#[derive(Serialize)]
struct TransportCounts {
    sse: usize,
    streamable_http: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        server: "odcaf-mcp-server",
        version: env!("CARGO_PKG_VERSION"),
        facilities: state.ctx.index().len(),
        started_at: state.started_at,
        transports: TransportCounts {
            sse: state.sse_sessions.len().await,
            streamable_http: state.streamable_session_count().await,
        },
    })
}

// ============ REST API ============

/// Parse an optional numeric query parameter. Unparseable values and
/// values below 1 count as absent so the default applies.
fn numeric_param(params: &HashMap<String, String>, key: &str) -> Option<i64> {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 1)
}

/// `{ "success": true, ...structured }`, plus the plain table for result sets.
fn success_body(output: &ToolOutput, extra: Option<(&str, Value)>) -> Value {
    let mut body = output.structured();
    if let Value::Object(ref mut map) = body {
        map.insert("success".to_string(), Value::Bool(true));
        if let Some(table) = output.table() {
            map.insert("table".to_string(), Value::String(table));
        }
        if let Some((key, value)) = extra {
            map.insert(key.to_string(), value);
        }
    }
    body
}

async fn handle_api_search(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let query = params
        .get("query")
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| bad_request("Query parameter \"query\" is required"))?
        .to_string();

    let result = state.ctx.search(&query, numeric_param(&params, "maxResults"))?;
    Ok(Json(success_body(&ToolOutput::Search { query, result }, None)))
}

async fn handle_api_facility(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let fetched = state.ctx.fetch_str(&id)?;
    Ok(Json(success_body(&ToolOutput::Fetch(fetched), None)))
}

async fn handle_api_filter(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let criteria = FilterCriteria {
        province: params.get("province").cloned(),
        city: params.get("city").cloned(),
        facility_type: params.get("facilityType").cloned(),
    }
    .normalized();

    let result = state.ctx.filter(&criteria, numeric_param(&params, "limit"))?;
    Ok(Json(success_body(&ToolOutput::Filter { criteria, result }, None)))
}

async fn handle_api_types(State(state): State<AppState>) -> Json<Value> {
    let types = state.ctx.list_types();
    let count = types.len();
    Json(success_body(
        &ToolOutput::ListTypes { types },
        Some(("count", Value::from(count))),
    ))
}

async fn handle_api_provinces(State(state): State<AppState>) -> Json<Value> {
    let provinces = state.ctx.list_provinces();
    let count = provinces.len();
    Json(success_body(
        &ToolOutput::ListProvinces { provinces },
        Some(("count", Value::from(count))),
    ))
}

async fn handle_api_stats(State(state): State<AppState>) -> Json<Value> {
    Json(success_body(&ToolOutput::Stats(state.ctx.stats()), None))
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

/// Look up the tool, validate parameters against its schema, and execute.
///
/// Returns `404` for an unknown tool or facility, `400` for invalid
/// parameters, and `500` for any other execution failure.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let validated_params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| bad_request(e.to_string()))?;

    let output = tool
        .execute(validated_params, &state.ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": output.structured() })))
}

// ============ Widget ============

async fn handle_widget(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info!(user_agent, "widget requested");

    let dist_dir = &state.config.widget.dist_dir;
    match render_widget_html(dist_dir).await {
        Ok(html) => (
            [
                (header::CONTENT_TYPE, WIDGET_MIME),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            html,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "widget bundle not found");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                missing_bundle_message(dist_dir),
            )
                .into_response()
        }
    }
}

/// Serve one file of the widget bundle from `[widget].dist_dir`.
async fn handle_widget_asset(
    State(state): State<AppState>,
    Path(file): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    parts.uri = format!("/{}", file.trim_start_matches('/'))
        .parse()
        .map_err(|_| bad_request(format!("invalid asset path: {}", file)))?;

    ServeDir::new(&state.config.widget.dist_dir)
        .try_call(Request::from_parts(parts, body))
        .await
        .map(IntoResponse::into_response)
        .map_err(|e| internal(format!("failed to read widget asset: {}", e)))
}
