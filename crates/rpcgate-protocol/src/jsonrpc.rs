//! JSON-RPC 2.0 envelopes and structural validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// The only keys a request envelope may carry.
const ENVELOPE_KEYS: [&str; 4] = ["jsonrpc", "method", "params", "id"];

/// JSON-RPC 2.0 request ID: Either a string or integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    /// Integer ids above `i64::MAX`.
    Unsigned(u64),
}

impl RequestId {
    /// Accepts strings and integers only. Floats, booleans and null are not
    /// ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Number)
                .or_else(|| n.as_u64().map(Self::Unsigned)),
            _ => None,
        }
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(Self::Unsigned(n), Self::Number)
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Request parameters, by position or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Params {
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

/// A structurally valid JSON-RPC 2.0 request.
///
/// `id == None` marks a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Params,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, params: Params, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Validate a decoded JSON value against the request envelope shape.
    ///
    /// Any failure yields `InvalidRequest`. The caller must answer it with a
    /// null id, whatever id the candidate claimed to carry.
    pub fn from_value(value: Value) -> Result<Self, RpcError> {
        let Value::Object(mut obj) = value else {
            return Err(RpcError::invalid_request());
        };

        if obj.keys().any(|k| !ENVELOPE_KEYS.contains(&k.as_str())) {
            return Err(RpcError::invalid_request());
        }

        match obj.get("jsonrpc") {
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            _ => return Err(RpcError::invalid_request()),
        }

        let method = match obj.remove("method") {
            Some(Value::String(m)) => m,
            _ => return Err(RpcError::invalid_request()),
        };

        let id = match obj.get("id") {
            None => None,
            Some(raw) => Some(RequestId::from_value(raw).ok_or_else(RpcError::invalid_request)?),
        };

        let params = match obj.remove("params") {
            None => Params::default(),
            Some(Value::Array(values)) => Params::Positional(values),
            Some(Value::Object(map)) => Params::Named(map),
            Some(_) => return Err(RpcError::invalid_request()),
        };

        Ok(Self::new(method, params, id))
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 success response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub jsonrpc: String,
    pub result: Value,
    pub id: RequestId,
}

/// JSON-RPC 2.0 error response. `id` serializes as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub jsonrpc: String,
    pub error: RpcError,
    pub id: Option<RequestId>,
}

/// JSON-RPC 2.0 response (success or error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

/// What one HTTP call produces: a single response or a batch of responses.
///
/// "No content" (every request was a notification) is modelled as the
/// absence of a `Reply`, never as an empty batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Single(Response),
    Batch(Vec<Response>),
}

/// Result of a method handler: `Ok` is a success value, `Err` an
/// application-level failure sent back under the request's id.
pub type HandlerResult = Result<Value, RpcError>;

// ─────────────────────────────────────────────────────────────────────────────
// Helper constructors
// ─────────────────────────────────────────────────────────────────────────────

impl SuccessResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            result,
            id,
        }
    }
}

impl ErrorResponse {
    pub fn new(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            error,
            id,
        }
    }
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Success(SuccessResponse::new(id, result))
    }

    pub fn error(id: Option<RequestId>, error: RpcError) -> Self {
        Self::Error(ErrorResponse::new(id, error))
    }

    /// Build the envelope for a handler outcome.
    pub fn from_result(id: RequestId, result: HandlerResult) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(error) => Self::error(Some(id), error),
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Success(r) => Some(&r.id),
            Self::Error(r) => r.id.as_ref(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
