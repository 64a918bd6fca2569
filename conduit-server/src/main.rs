use anyhow::Result;
use clap::Parser;
use conduit::api::ApiServer;
use conduit::config::Config;
use conduit::mcp::tools::{register_graphql_tools, ToolRegistry};
use conduit::upstream::GraphqlClient;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "conduit-server")]
#[command(about = "MCP over SSE server backed by a GraphQL API")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "conduit.toml", env = "CONDUIT_CONFIG")]
    config: String,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.effective_log_level()));
    let format = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| config.observability.log_format.clone());

    if let Some(log_file) = &config.logging.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false);
        if format == "json" {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    } else if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

/// Resolve the bind address from config plus CLI overrides
fn bind_addr(config: &Config, args: &Args) -> String {
    let (cfg_host, cfg_port) = config
        .server
        .bind_addr
        .rsplit_once(':')
        .unwrap_or((config.server.bind_addr.as_str(), "3080"));
    let host = args.host.as_deref().unwrap_or(cfg_host);
    match args.port {
        Some(port) => format!("{}:{}", host, port),
        None => format!("{}:{}", host, cfg_port),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load_or_create(std::path::Path::new(&args.config))?;
    init_tracing(&config)?;

    tracing::info!("Config file: {}", args.config);

    let client = Arc::new(GraphqlClient::new(
        &config.upstream.url,
        config.upstream.timeout_ms,
    )?);
    tracing::info!("GraphQL upstream: {}", client.url());

    let mut registry = ToolRegistry::new();
    register_graphql_tools(&mut registry, &config.tools, client);
    tracing::info!("Registered {} tools", registry.len());

    let mut server = ApiServer::new(&config, Arc::new(registry));
    if config.observability.metrics_enabled {
        server = server.with_metrics(conduit::metrics::install_recorder()?);
    }

    let addr = bind_addr(&config, &args);
    tracing::info!(
        "Starting conduit on {} (stream: {}, submissions: {})",
        addr,
        config.mcp.sse_path,
        config.mcp.message_path
    );

    server.serve(&addr).await?;

    Ok(())
}
