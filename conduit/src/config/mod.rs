//! Configuration management for conduit
//!
//! Default config location: ./conduit.toml

mod tools;

pub use tools::ToolDefinition;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Tool catalog advertised through `tools/list`
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Maximum submission body size in bytes (default: 4MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3080".to_string()
}

fn default_max_body_size() -> usize {
    4 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors: CorsConfig::default(),
            max_body_size: default_max_body_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed origins. Use "*" for any origin, or list specific origins.
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: default_cors_origins(),
        }
    }
}

/// SSE transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpConfig {
    /// Path clients GET to open their event stream
    #[serde(default = "default_sse_path")]
    pub sse_path: String,
    /// Path clients POST JSON-RPC submissions to
    #[serde(default = "default_message_path")]
    pub message_path: String,
    /// Interval between keep-alive comment frames
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Optional cap on concurrently open streams
    #[serde(default)]
    pub max_sessions: Option<usize>,
    /// Replies queued on one stream before further ones are dropped
    #[serde(default = "default_max_pending_replies")]
    pub max_pending_replies: usize,
}

fn default_sse_path() -> String {
    "/sse".to_string()
}

fn default_message_path() -> String {
    "/messages".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_max_pending_replies() -> usize {
    crate::mcp::session::DEFAULT_MAX_PENDING_REPLIES
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            sse_path: default_sse_path(),
            message_path: default_message_path(),
            keep_alive_secs: default_keep_alive_secs(),
            max_sessions: None,
            max_pending_replies: default_max_pending_replies(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// GraphQL endpoint URL
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_ms: u64,
}

fn default_upstream_url() -> String {
    "http://localhost:4000/graphql".to_string()
}

fn default_upstream_timeout() -> u64 {
    30000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_ms: default_upstream_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    /// Overrides `observability.log_level` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics at GET /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,conduit=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

const RESERVED_PATHS: &[&str] = &["/", "/health", "/metrics"];

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.expand_paths()?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Err(e) = config.save(config_path) {
                tracing::warn!("Could not write default config to {:?}: {}", config_path, e);
            }
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Log filter used when RUST_LOG is unset.
    ///
    /// Precedence: RUST_LOG, then `logging.level`, then
    /// `observability.log_level`.
    pub fn effective_log_level(&self) -> &str {
        self.logging
            .level
            .as_deref()
            .unwrap_or(&self.observability.log_level)
    }

    fn expand_paths(&mut self) -> Result<()> {
        if let Some(ref f) = self.logging.file {
            self.logging.file = Some(expand_tilde(f)?);
        }
        Ok(())
    }

    /// Reject configs the server cannot route.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.mcp.sse_path, &self.mcp.message_path] {
            if !path.starts_with('/') {
                return Err(anyhow!("MCP path must start with '/': {}", path));
            }
            if RESERVED_PATHS.contains(&path.as_str()) {
                return Err(anyhow!("MCP path collides with a status route: {}", path));
            }
        }
        if self.mcp.sse_path == self.mcp.message_path {
            return Err(anyhow!(
                "sse_path and message_path must differ (both are {})",
                self.mcp.sse_path
            ));
        }
        if self.mcp.keep_alive_secs == 0 {
            return Err(anyhow!("keep_alive_secs must be greater than zero"));
        }
        if self.mcp.max_pending_replies == 0 {
            return Err(anyhow!("max_pending_replies must be greater than zero"));
        }
        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name.as_str()) {
                return Err(anyhow!("Duplicate tool name: {}", tool.name));
            }
        }
        Ok(())
    }
}
