use super::server::AppState;
use crate::mcp::handler::{PROTOCOL_VERSION, SERVER_NAME};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub sessions: usize,
}

/// GET /health - liveness plus open session count
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        sessions: state.registry.active_count(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub protocol_version: &'static str,
    pub transport: &'static str,
    pub tools: Vec<String>,
}

/// GET / - capability and version report
pub async fn server_info(State(state): State<AppState>) -> Json<ServerInfo> {
    let tools = state
        .mcp_handler
        .tools()
        .list()
        .into_iter()
        .map(|t| t.name)
        .collect();

    Json(ServerInfo {
        name: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        protocol_version: PROTOCOL_VERSION,
        transport: "sse",
        tools,
    })
}

/// GET /metrics - Prometheus text format
pub async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}
