//! JSON-RPC 2.0 envelopes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

pub const JSONRPC_VERSION: &str = "2.0";

/// Inbound JSON-RPC message.
///
/// A missing `id` marks a notification. An explicit `"id": null` is read the
/// same way.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<Value>, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// Outbound reply. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
            }),
        }
    }

    pub fn from_error(id: Value, err: &Error) -> Self {
        Self::error(id, err.code(), &err.to_string())
    }
}

/// Parse a submission body into exactly one request envelope.
///
/// Batch arrays and non-2.0 envelopes are rejected.
pub fn parse_envelope(body: &[u8]) -> Result<JsonRpcRequest> {
    let value: Value = serde_json::from_slice(body)?;
    if value.is_array() {
        return Err(Error::InvalidParams(
            "batch requests are not supported".to_string(),
        ));
    }
    let req: JsonRpcRequest = serde_json::from_value(value)?;
    if req.jsonrpc != JSONRPC_VERSION {
        return Err(Error::InvalidParams(format!(
            "unsupported jsonrpc version: {}",
            req.jsonrpc
        )));
    }
    Ok(req)
}
