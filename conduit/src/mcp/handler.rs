//! MCP JSON-RPC 2.0 dispatcher

use serde_json::{json, Value};
use std::sync::Arc;

use super::delivery::DeliveryChannel;
use super::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use super::tools::ToolExecutor;
use crate::{Error, Result};

/// MCP protocol revision spoken by the SSE transport
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "conduit";

/// MCP protocol handler
pub struct McpHandler {
    tools: Arc<dyn ToolExecutor>,
}

impl McpHandler {
    pub fn new(tools: Arc<dyn ToolExecutor>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &Arc<dyn ToolExecutor> {
        &self.tools
    }

    /// Handle a JSON-RPC request.
    ///
    /// Returns `None` when nothing may be sent back: for every notification
    /// (failed or not) and for `notifications/initialized`.
    pub async fn handle(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let outcome = self.dispatch(&req.method, req.params).await;
        crate::metrics::record_rpc(
            &req.method,
            if outcome.is_ok() { "ok" } else { "error" },
        );

        let Some(id) = req.id else {
            if let Err(e) = outcome {
                tracing::debug!(method = %req.method, "Notification failed: {}", e);
            }
            return None;
        };

        match outcome {
            Ok(Some(result)) => Some(JsonRpcResponse::success(id, result)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(method = %req.method, "MCP request failed: {}", e);
                Some(JsonRpcResponse::from_error(id, &e))
            }
        }
    }

    /// Handle `req` and push any reply onto the session's stream
    pub async fn handle_and_deliver(
        &self,
        delivery: &DeliveryChannel,
        session_id: &str,
        req: JsonRpcRequest,
    ) {
        if let Some(response) = self.handle(req).await {
            delivery.deliver(session_id, &response);
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Option<Value>> {
        match method {
            "initialize" => Ok(Some(Self::initialize_result())),
            "notifications/initialized" => Ok(None),
            "tools/list" => Ok(Some(json!({ "tools": self.tools.list() }))),
            "tools/call" => self.handle_tools_call(params).await.map(Some),
            "ping" => Ok(Some(json!({}))),
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }

    fn initialize_result() -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value> {
        let params = params.ok_or_else(|| Error::InvalidParams("Missing params".to_string()))?;

        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidParams("Missing tool name".to_string()))?;

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args.clone(),
        };

        let result = self.tools.invoke(name, arguments).await?;

        Ok(json!({
            "content": [{
                "type": "text",
                "text": serde_json::to_string_pretty(&result)?
            }]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::ToolDescriptor;
    use async_trait::async_trait;

    struct FakeTools;

    #[async_trait]
    impl ToolExecutor for FakeTools {
        fn list(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor {
                name: "get_issue".to_string(),
                description: "Fetch an issue".to_string(),
                input_schema: json!({"type": "object"}),
            }]
        }

        async fn invoke(&self, name: &str, arguments: Value) -> Result<Value> {
            match name {
                "get_issue" => Ok(json!({"issue": arguments})),
                "broken" => Err(Error::Upstream("boom".to_string())),
                other => Err(Error::UnknownTool(other.to_string())),
            }
        }
    }

    fn handler() -> McpHandler {
        McpHandler::new(Arc::new(FakeTools))
    }

    fn request(id: Option<Value>, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, params)
    }

    #[tokio::test]
    async fn ping_returns_empty_result_every_time() {
        let h = handler();
        for i in 0..3 {
            let resp = h.handle(request(Some(json!(i)), "ping", None)).await.unwrap();
            assert_eq!(resp.result, Some(json!({})));
            assert!(resp.error.is_none());
            assert_eq!(resp.id, json!(i));
        }
    }

    #[tokio::test]
    async fn initialize_reports_version_and_capabilities() {
        let resp = handler()
            .handle(request(Some(json!(1)), "initialize", Some(json!({}))))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn initialized_notification_produces_no_reply() {
        let h = handler();
        assert!(h
            .handle(request(None, "notifications/initialized", None))
            .await
            .is_none());
        // Even with an id it is an acknowledgment, not a request.
        assert!(h
            .handle(request(Some(json!(9)), "notifications/initialized", None))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn tools_list_returns_catalog() {
        let resp = handler()
            .handle(request(Some(json!(2)), "tools/list", None))
            .await
            .unwrap();
        let tools = &resp.result.unwrap()["tools"];
        assert_eq!(tools[0]["name"], "get_issue");
        assert_eq!(tools[0]["inputSchema"], json!({"type": "object"}));
    }

    #[tokio::test]
    async fn tools_call_wraps_pretty_json_text() {
        let resp = handler()
            .handle(request(
                Some(json!(3)),
                "tools/call",
                Some(json!({"name": "get_issue", "arguments": {"id": "X-1"}})),
            ))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        let content = result["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        let expected = serde_json::to_string_pretty(&json!({"issue": {"id": "X-1"}})).unwrap();
        assert_eq!(content[0]["text"], expected);
    }

    #[tokio::test]
    async fn tools_call_defaults_arguments_to_empty_object() {
        let resp = handler()
            .handle(request(
                Some(json!(4)),
                "tools/call",
                Some(json!({"name": "get_issue"})),
            ))
            .await
            .unwrap();
        let text = resp.result.unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        let decoded: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, json!({"issue": {}}));
    }

    #[tokio::test]
    async fn unknown_tool_is_internal_error_with_name() {
        let resp = handler()
            .handle(request(
                Some(json!(5)),
                "tools/call",
                Some(json!({"name": "nope"})),
            ))
            .await
            .unwrap();
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "Unknown tool: nope");
    }

    #[tokio::test]
    async fn unknown_method_is_internal_error() {
        let resp = handler()
            .handle(request(Some(json!(6)), "resources/list", None))
            .await
            .unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32603);
        assert!(err.message.contains("resources/list"));
    }

    #[tokio::test]
    async fn missing_params_is_internal_error() {
        let resp = handler()
            .handle(request(Some(json!(7)), "tools/call", None))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, -32603);
    }

    #[tokio::test]
    async fn failing_notification_is_swallowed() {
        let h = handler();
        assert!(h.handle(request(None, "no/such/method", None)).await.is_none());
        assert!(h
            .handle(request(
                None,
                "tools/call",
                Some(json!({"name": "broken"}))
            ))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn handle_and_deliver_writes_to_session() {
        use crate::mcp::session::SessionRegistry;

        let registry = Arc::new(SessionRegistry::new());
        let (id, mut rx) = registry.create().unwrap();
        let delivery = DeliveryChannel::new(registry);

        handler()
            .handle_and_deliver(&delivery, &id, request(Some(json!(1)), "ping", None))
            .await;
        let event = rx.try_recv().unwrap();
        let resp: JsonRpcResponse = serde_json::from_str(&event.data).unwrap();
        assert_eq!(resp, JsonRpcResponse::success(json!(1), json!({})));

        handler()
            .handle_and_deliver(&delivery, &id, request(None, "ping", None))
            .await;
        assert!(rx.try_recv().is_err());
    }
}
