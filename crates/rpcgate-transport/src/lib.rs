//! JSON-RPC over HTTP transport layer.
//!
//! The transport turns HTTP calls into decoded JSON-RPC bodies and back:
//! - Method, `Content-Type` and `Accept` gates
//! - CORS preflight and allow-origin headers
//! - Pre-dispatch checks (bearer token authentication)
//! - Axum hosting with graceful shutdown
//!
//! The transport is decoupled from method dispatch via the `RequestHandler` trait.

pub mod adapter;
pub mod auth;
pub mod checks;
pub mod cors;
pub mod error;
pub mod server;

pub use adapter::{HttpAdapter, HttpRequest, HttpResponse, RPC_CONTENT_TYPE, RequestHandler, media_type_matches};
pub use auth::{AuthErrorCode, BearerTokenCheck};
pub use checks::{CheckChain, PreDispatchCheck};
pub use cors::CorsPolicy;
pub use error::TransportError;
pub use server::{TransportConfig, TransportServer};
