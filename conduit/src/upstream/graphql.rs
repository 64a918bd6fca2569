//! Minimal GraphQL-over-HTTP client

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Executes GraphQL operations against one endpoint
pub struct GraphqlClient {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

impl GraphqlClient {
    pub fn new(url: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run `query` with `variables` and return the `data` member.
    ///
    /// Transport failures, non-2xx statuses and any GraphQL `errors` are
    /// reported as `Error::Upstream`.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "GraphQL upstream returned error status");
            return Err(Error::Upstream(format!("status {}: {}", status, body)));
        }

        let body: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("invalid response body: {}", e)))?;

        interpret(body)
    }
}

fn interpret(body: GraphqlResponse) -> Result<Value> {
    if !body.errors.is_empty() {
        let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Upstream(messages.join("; ")));
    }
    Ok(body.data.unwrap_or(Value::Null))
}
