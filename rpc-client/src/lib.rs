//! Private JSON-RPC client for LMS server communication
//!
//! This crate provides a minimal blocking JSON-RPC client specifically
//! designed for the LMS control protocol: every call is one HTTP POST of a
//! `slim.request` envelope, and the answer is the `result` field of the
//! response body. No retries, no connection management beyond the agent's
//! own pooling.

mod error;

pub use error::RpcError;

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// JSON-RPC method name used for every LMS control call.
const RPC_METHOD: &str = "slim.request";

/// Fixed request id. The server echoes it back; nothing correlates on it.
const RPC_ID: u32 = 1;

/// One outbound call: target player, then the command with its arguments.
///
/// Serializes to `{"id":1,"method":"slim.request","params":[target,[…]]}`.
#[derive(Debug, Serialize)]
struct RequestEnvelope<'a> {
    id: u32,
    method: &'a str,
    params: (&'a str, &'a [Value]),
}

/// A minimal JSON-RPC client for LMS server communication
#[derive(Debug, Clone)]
pub struct RpcClient {
    agent: ureq::Agent,
}

impl RpcClient {
    /// Create a new client with the default 5-second request timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Create a new client with a caller-specified request timeout
    ///
    /// The timeout bounds the whole HTTP exchange; connect setup keeps its
    /// own 5-second cap so a dead host fails fast even with long timeouts.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout(timeout)
                .build(),
        }
    }

    /// Send one request and return the `result` value of the response.
    ///
    /// # Arguments
    /// * `url` - Full query endpoint, e.g. `http://host:9000/jsonrpc.js`
    /// * `target` - Player id the command applies to; empty string for
    ///   server-level calls
    /// * `command` - Command name followed by its arguments, in order
    pub fn call(&self, url: &str, target: &str, command: &[Value]) -> Result<Value, RpcError> {
        let envelope = RequestEnvelope {
            id: RPC_ID,
            method: RPC_METHOD,
            params: (target, command),
        };

        let response = self
            .agent
            .post(url)
            .send_json(&envelope)
            .map_err(|e| RpcError::Network(e.to_string()))?;

        let body: Value = response
            .into_json()
            .map_err(|e| RpcError::Parse(e.to_string()))?;

        extract_result(body)
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_result(body: Value) -> Result<Value, RpcError> {
    match body {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| RpcError::Parse("missing \"result\" field in response".to_string())),
        other => Err(RpcError::Parse(format!(
            "expected a JSON object response, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
