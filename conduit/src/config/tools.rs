//! Tool catalog entries backed by GraphQL operations

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One tool exposed to MCP clients.
///
/// The GraphQL document is sent verbatim; the call's `arguments` object
/// becomes the operation's `variables`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the tool input, written as a TOML table
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
    /// GraphQL query or mutation document
    pub query: String,
    /// Dotted path into the response `data` to return instead of the whole object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
}

fn default_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}
