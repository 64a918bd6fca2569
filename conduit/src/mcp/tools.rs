//! MCP tool registry and the tool-execution seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ToolDefinition;
use crate::upstream::GraphqlClient;
use crate::{Error, Result};

/// Catalog entry returned by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Executes tools on behalf of the dispatcher.
///
/// This is the only thing the dispatcher knows about tools; swap it out to
/// test the transport without an upstream.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Static catalog, in a stable order
    fn list(&self) -> Vec<ToolDescriptor>;

    /// Run `name` with `arguments`. Unknown names fail with `Error::UnknownTool`.
    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value>;
}

/// Trait for MCP tools
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (used in tools/call)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn call(&self, arguments: Value) -> Result<Value>;
}

/// Registry of available MCP tools
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn McpTool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn McpTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        let started = Instant::now();
        let result = tool.call(arguments).await;
        crate::metrics::record_tool_duration(name, started.elapsed());
        result
    }
}

// ============================================================================
// GraphQL-backed tools
// ============================================================================

/// Tool that runs one configured GraphQL operation
pub struct GraphqlTool {
    definition: ToolDefinition,
    client: Arc<GraphqlClient>,
}

impl GraphqlTool {
    pub fn new(definition: ToolDefinition, client: Arc<GraphqlClient>) -> Self {
        Self { definition, client }
    }
}

#[async_trait]
impl McpTool for GraphqlTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn input_schema(&self) -> Value {
        self.definition.input_schema.clone()
    }

    async fn call(&self, arguments: Value) -> Result<Value> {
        if !arguments.is_object() {
            return Err(Error::InvalidParams(format!(
                "arguments for {} must be an object",
                self.definition.name
            )));
        }

        let data = self.client.execute(&self.definition.query, arguments).await?;

        Ok(match &self.definition.result_path {
            Some(path) => select_path(&data, path),
            None => data,
        })
    }
}

/// Walk a dotted path (`viewer.issues.nodes`) into a JSON value.
///
/// Numeric segments index into arrays. A missing segment yields `null`.
pub fn select_path(value: &Value, path: &str) -> Value {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Register one `GraphqlTool` per configured definition
pub fn register_graphql_tools(
    registry: &mut ToolRegistry,
    definitions: &[ToolDefinition],
    client: Arc<GraphqlClient>,
) {
    for def in definitions {
        tracing::debug!(tool = %def.name, "Registering GraphQL tool");
        registry.register(Arc::new(GraphqlTool::new(def.clone(), client.clone())));
    }
}
