//! MCP (Model Context Protocol) over HTTP SSE
//!
//! This module provides the session transport with:
//! - SessionRegistry: session id to open stream mapping
//! - stream: per-connection stream lifecycle (endpoint event, keep-alive, teardown)
//! - McpHandler: JSON-RPC 2.0 dispatch
//! - DeliveryChannel: best-effort reply delivery onto a session's stream
//! - ToolRegistry: tool catalog behind the `ToolExecutor` seam

pub mod delivery;
pub mod handler;
pub mod jsonrpc;
pub mod session;
pub mod stream;
pub mod tools;

pub use delivery::DeliveryChannel;
pub use handler::McpHandler;
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use session::{SessionRegistry, SseEvent};
pub use tools::{ToolDescriptor, ToolExecutor, ToolRegistry};
