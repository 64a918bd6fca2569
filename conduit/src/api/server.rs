use crate::config::{Config, CorsConfig, McpConfig};
use crate::mcp::jsonrpc::parse_envelope;
use crate::mcp::stream::{self, SESSION_QUERY_PARAM};
use crate::mcp::{DeliveryChannel, McpHandler, SessionRegistry, ToolExecutor};
use crate::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header::HeaderName, HeaderValue, Method, StatusCode},
    response::{sse::Sse, IntoResponse},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub mcp_handler: Arc<McpHandler>,
    pub delivery: DeliveryChannel,
    pub mcp_config: Arc<McpConfig>,
    pub metrics: Option<PrometheusHandle>,
}

pub struct ApiServer {
    state: AppState,
    cors_config: CorsConfig,
    max_body_size: usize,
}

impl ApiServer {
    /// Build a server with a fresh session registry
    pub fn new(config: &Config, tools: Arc<dyn ToolExecutor>) -> Self {
        let registry = Arc::new(SessionRegistry::with_limits(
            config.mcp.max_sessions,
            config.mcp.max_pending_replies,
        ));
        Self::with_registry(config, tools, registry)
    }

    /// Build a server around an existing registry
    pub fn with_registry(
        config: &Config,
        tools: Arc<dyn ToolExecutor>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        let state = AppState {
            delivery: DeliveryChannel::new(registry.clone()),
            registry,
            mcp_handler: Arc::new(McpHandler::new(tools)),
            mcp_config: Arc::new(config.mcp.clone()),
            metrics: None,
        };

        Self {
            state,
            cors_config: config.server.cors.clone(),
            max_body_size: config.server.max_body_size,
        }
    }

    /// Expose Prometheus metrics at GET /metrics
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.state.registry.clone()
    }

    /// GET {sse_path} - open an MCP event stream
    async fn sse_handler(
        State(state): State<AppState>,
    ) -> std::result::Result<impl IntoResponse, StatusCode> {
        let (id, events) = stream::open_session(&state.registry, &state.mcp_config.message_path)
            .map_err(|e| {
                tracing::error!("Failed to open MCP session: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            })?;
        tracing::debug!(session_id = %id, "SSE stream established");

        let interval = Duration::from_secs(state.mcp_config.keep_alive_secs);
        let sse =
            Sse::new(events.map(stream::to_sse_event)).keep_alive(stream::keep_alive(interval));

        Ok((
            [(
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            )],
            sse,
        ))
    }

    /// POST {message_path}?sessionId=... - submit one JSON-RPC message
    ///
    /// Acknowledges with 202 once the envelope is accepted. The JSON-RPC
    /// reply, if any, arrives later on the session's stream.
    async fn message_handler(
        State(state): State<AppState>,
        Query(query): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> (StatusCode, &'static str) {
        let Some(session_id) = query.get(SESSION_QUERY_PARAM).cloned() else {
            return (StatusCode::BAD_REQUEST, "Missing sessionId");
        };

        if !state.registry.contains(&session_id) {
            tracing::debug!(session_id = %session_id, "Submission for unknown session");
            return (StatusCode::NOT_FOUND, "Unknown session");
        }

        let req = match parse_envelope(&body) {
            Ok(req) => req,
            Err(e) => {
                tracing::debug!(session_id = %session_id, "Rejected submission: {}", e);
                return (StatusCode::BAD_REQUEST, "Invalid JSON-RPC message");
            }
        };

        tracing::debug!(session_id = %session_id, method = %req.method, "Accepted submission");

        let handler = state.mcp_handler.clone();
        let delivery = state.delivery.clone();
        tokio::spawn(async move {
            handler.handle_and_deliver(&delivery, &session_id, req).await;
        });

        (StatusCode::ACCEPTED, "Accepted")
    }

    /// Build CORS layer from configuration
    fn build_cors_layer(&self) -> CorsLayer {
        if !self.cors_config.enabled {
            return CorsLayer::new();
        }

        let origins: Vec<HeaderValue> = self
            .cors_config
            .origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| o.parse().ok())
            .collect();

        let has_wildcard = self.cors_config.origins.iter().any(|o| o == "*");

        let cors = if has_wildcard {
            CorsLayer::new().allow_origin(tower_http::cors::Any)
        } else if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(origins)
        };

        cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }

    pub fn router(&self) -> Router {
        let mcp = &self.state.mcp_config;

        let mcp_routes = Router::new()
            .route(&mcp.sse_path, get(Self::sse_handler))
            .route(&mcp.message_path, post(Self::message_handler))
            .layer(DefaultBodyLimit::max(self.max_body_size));

        let status_routes = Router::new()
            .route("/", get(crate::api::routes::server_info))
            .route("/health", get(crate::api::routes::health))
            .route("/metrics", get(crate::api::routes::metrics));

        Router::new()
            .merge(mcp_routes)
            .merge(status_routes)
            .with_state(self.state.clone())
            .layer(self.build_cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
