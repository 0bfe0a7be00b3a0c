//! JSON-RPC 2.0 request / response envelopes.
//!
//! Envelopes are kept opaque beyond `method` and `params`: the id is any JSON
//! value (or absent, for notifications) and params are preserved exactly as
//! received so forwarded requests reach the upstream untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::errors::TransportError;
use crate::utils::serde_helpers::present;

pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// `None` for a notification; an explicit `null` id stays `Some(Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id: Some(id.into()),
            jsonrpc: default_version(),
            method: method.into(),
            params: Value::Array(params),
        }
    }

    /// The id as it appears in logs and error envelopes; `null` for a notification.
    pub fn id_or_null(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    /// Positional param `index`, if present.
    pub fn param(&self, index: usize) -> Option<&Value> {
        match &self.params {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Params as a positional list; a non-array value becomes a single argument.
    pub fn params_list(&self) -> Vec<Value> {
        match &self.params {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// A request the provider issues on behalf of this one.
    ///
    /// Numeric ids are bumped by one so the sub-request can be told apart in
    /// upstream logs; any other id is reused, and a notification stays one.
    pub fn sub_request(&self, method: &str, params: Vec<Value>) -> Request {
        let id = self.id.as_ref().map(|id| match id {
            Value::Number(n) => match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => Value::from(u.wrapping_add(1)),
                (None, Some(i)) => Value::from(i.wrapping_add(1)),
                _ => id.clone(),
            },
            other => other.clone(),
        });
        Request {
            id,
            jsonrpc: self.jsonrpc.clone(),
            method: method.to_string(),
            params: Value::Array(params),
        }
    }
}

/// JSON-RPC error member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Value,
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Response {
    /// Successful response correlated with `request`; a notification is
    /// answered with a null id.
    pub fn result(request: &Request, result: Value) -> Self {
        Self {
            id: request.id_or_null(),
            jsonrpc: request.jsonrpc.clone(),
            result: Some(result),
            error: None,
        }
    }

    /// Error response carrying `id`.
    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self { id, jsonrpc: default_version(), result: None, error: Some(error) }
    }

    /// Unwrap the result member, turning an error member into `TransportError::Rpc`.
    pub fn into_result(self) -> Result<Value, TransportError> {
        match (self.error, self.result) {
            (Some(e), _) => Err(TransportError::Rpc(e)),
            (None, Some(v)) => Ok(v),
            (None, None) => Err(TransportError::InvalidResponse(
                "response carries neither result nor error".into(),
            )),
        }
    }
}
