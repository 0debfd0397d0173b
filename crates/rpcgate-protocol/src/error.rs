//! JSON-RPC 2.0 error codes and the wire error object.
//!
//! The reserved protocol codes come straight from the JSON-RPC 2.0
//! specification. The HTTP transport adds three extension codes starting at
//! zero for failures that happen before a request envelope is even read.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard JSON-RPC 2.0 error codes plus the HTTP transport extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    // JSON-RPC 2.0 standard errors
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,

    // Reserved implementation-defined server error
    ServerError,

    // Transport extensions
    OnlyPostAllowed,
    BadContentType,
    BadAccept,

    // Application-defined code returned by a handler
    Custom(i64),
}

impl RpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::ServerError => -32000,
            Self::OnlyPostAllowed => 0,
            Self::BadContentType => 1,
            Self::BadAccept => 2,
            Self::Custom(c) => *c,
        }
    }

    /// The canonical message sent on the wire for this code.
    pub fn message(&self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::ServerError => "Server error",
            Self::OnlyPostAllowed => "Only POST allowed",
            Self::BadContentType => "Bad or missing Content-Type header",
            Self::BadAccept => "Bad Accept header",
            Self::Custom(_) => "Application error",
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32000 => Self::ServerError,
            0 => Self::OnlyPostAllowed,
            1 => Self::BadContentType,
            2 => Self::BadAccept,
            c => Self::Custom(c),
        }
    }
}

/// JSON-RPC 2.0 error object.
///
/// This is also the failure half of [`HandlerResult`](crate::HandlerResult):
/// a handler that returns `Err(RpcError)` produces an error envelope carrying
/// exactly this code and message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("JSON-RPC error [{code}]: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Error with the canonical message for `code`.
    pub fn from_code(code: RpcErrorCode) -> Self {
        Self::new(code, code.message())
    }

    /// Application-level failure with an arbitrary code.
    pub fn custom(code: i64, message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::Custom(code), message)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::from_code(RpcErrorCode::ParseError)
    }

    pub fn invalid_request() -> Self {
        Self::from_code(RpcErrorCode::InvalidRequest)
    }

    pub fn method_not_found() -> Self {
        Self::from_code(RpcErrorCode::MethodNotFound)
    }

    pub fn invalid_params() -> Self {
        Self::from_code(RpcErrorCode::InvalidParams)
    }

    pub fn server_error() -> Self {
        Self::from_code(RpcErrorCode::ServerError)
    }

    pub fn only_post_allowed() -> Self {
        Self::from_code(RpcErrorCode::OnlyPostAllowed)
    }

    pub fn bad_content_type() -> Self {
        Self::from_code(RpcErrorCode::BadContentType)
    }

    pub fn bad_accept() -> Self {
        Self::from_code(RpcErrorCode::BadAccept)
    }

    pub fn error_code(&self) -> RpcErrorCode {
        RpcErrorCode::from_code(self.code)
    }
}
