//! rpcgate protocol types
//!
//! JSON-RPC 2.0 envelopes, request validation and error codes shared by the
//! dispatcher and the HTTP transport. This crate is the single source of
//! truth for everything that goes over the wire.

pub mod context;
pub mod error;
pub mod jsonrpc;

pub use context::CallerAddress;
pub use error::{RpcError, RpcErrorCode};
pub use jsonrpc::{
    ErrorResponse, HandlerResult, Params, Reply, RequestEnvelope, RequestId, Response,
    SuccessResponse, JSONRPC_VERSION,
};
