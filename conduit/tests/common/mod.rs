//! Shared helpers for end-to-end transport tests.

#![allow(dead_code)]

use conduit::api::ApiServer;
use conduit::mcp::{SessionRegistry, ToolExecutor};
use conduit::Config;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct TestServer {
    pub base_url: String,
    pub registry: Arc<SessionRegistry>,
    pub handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a real HTTP server on a random port.
pub async fn start_server(config: Config, tools: Arc<dyn ToolExecutor>) -> TestServer {
    let server = ApiServer::new(&config, tools);
    let registry = server.registry();
    let router = server.router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        base_url,
        registry,
        handle,
    }
}

/// Config with a short keep-alive so dead connections are noticed quickly.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.mcp.keep_alive_secs = 1;
    config
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

fn header(resp: &reqwest::Response, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Incremental SSE frame reader over a streaming reqwest response.
pub struct SseReader {
    resp: reqwest::Response,
    buf: String,
    pub comments: Vec<String>,
}

impl SseReader {
    pub async fn open(client: &Client, url: &str) -> Self {
        let resp = client.get(url).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let content_type = header(&resp, "content-type");
        assert!(
            content_type.starts_with("text/event-stream"),
            "unexpected content type {content_type}"
        );
        let cache_control = header(&resp, "cache-control");
        assert!(
            cache_control.contains("no-cache"),
            "unexpected cache-control {cache_control}"
        );
        assert_eq!(header(&resp, "x-accel-buffering"), "no");
        Self {
            resp,
            buf: String::new(),
            comments: Vec::new(),
        }
    }

    /// Next non-comment frame, or `None` when the stream ends.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            if let Some(pos) = self.buf.find("\n\n") {
                let raw: String = self.buf.drain(..pos + 2).collect();
                let mut event = "message".to_string();
                let mut data = Vec::new();
                for line in raw.lines() {
                    if let Some(comment) = line.strip_prefix(':') {
                        self.comments.push(comment.trim().to_string());
                    } else if let Some(v) = line.strip_prefix("event:") {
                        event = v.trim().to_string();
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data.push(v.strip_prefix(' ').unwrap_or(v).to_string());
                    }
                }
                if data.is_empty() {
                    continue;
                }
                return Some(Frame {
                    event,
                    data: data.join("\n"),
                });
            }

            let chunk = self.resp.chunk().await.ok()??;
            self.buf.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    /// Next frame within `wait`, or `None` if nothing arrived.
    pub async fn next_frame_within(&mut self, wait: Duration) -> Option<Frame> {
        tokio::time::timeout(wait, self.next_frame())
            .await
            .ok()
            .flatten()
    }

    /// Next `message` frame decoded as JSON.
    pub async fn next_message(&mut self) -> Value {
        let frame = self
            .next_frame_within(Duration::from_secs(5))
            .await
            .expect("expected a message frame");
        assert_eq!(frame.event, "message");
        serde_json::from_str(&frame.data).unwrap()
    }
}

/// Open a stream and return the reader plus the advertised submission path.
pub async fn open_session(client: &Client, base_url: &str) -> (SseReader, String) {
    let mut reader = SseReader::open(client, &format!("{}/sse", base_url)).await;
    let first = reader
        .next_frame_within(Duration::from_secs(5))
        .await
        .expect("endpoint frame");
    assert_eq!(first.event, "endpoint");
    (reader, first.data)
}

pub fn session_id_of(endpoint: &str) -> String {
    endpoint
        .split_once("sessionId=")
        .map(|(_, id)| id.to_string())
        .expect("endpoint carries sessionId")
}

/// POST a raw body to the submission path and return the HTTP status.
pub async fn submit(client: &Client, base_url: &str, endpoint: &str, body: &str) -> u16 {
    client
        .post(format!("{}{}", base_url, endpoint))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

/// Poll until `cond` holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    cond()
}
