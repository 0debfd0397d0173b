//! HTTP adapter: maps one HTTP call onto the JSON-RPC engine.
//!
//! The adapter is a pure function from an [`HttpRequest`] value to an
//! [`HttpResponse`] value. It runs a linear sequence of gates and the first
//! failing gate decides the response:
//!
//!   1. method (`POST` only; `OPTIONS` answers a CORS preflight)
//!   2. `Content-Type` (required, JSON-RPC media type)
//!   3. `Accept` (optional, same grammar)
//!   4. caller address extraction
//!   5. pre-dispatch checks
//!   6. body decoding (UTF-8, then JSON)
//!   7. dispatch to the [`RequestHandler`]
//!   8. status selection (`204` for no content, `200` otherwise)
//!
//! Socket I/O is left to the hosting layer (see [`crate::server`]).

use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use bytes::Bytes;
use rpcgate_protocol::{CallerAddress, Reply, Response, RpcError};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::checks::{CheckChain, PreDispatchCheck};
use crate::cors::CorsPolicy;

/// Content type of every JSON body the adapter emits.
pub const RPC_CONTENT_TYPE: &str = "application/json-rpc";

/// Media types accepted in `Content-Type` and `Accept`.
const ACCEPTED_MEDIA_TYPES: [&str; 3] = [
    "application/json-rpc",
    "application/json",
    "application/jsonrequest",
];

/// Request headers a browser may send on the actual call after a preflight.
const PREFLIGHT_ALLOW_HEADERS: &str =
    "Content-Type, Accept, Content-Length, Host, Origin, User-Agent, Referer";

/// Serialized fallback used if a reply cannot be encoded.
const SERVER_ERROR_BODY: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"Server error"},"id":null}"#;

/// Trait implemented by the JSON-RPC dispatcher.
/// The adapter calls this once per call with the decoded request body.
pub trait RequestHandler: Send + Sync + 'static {
    /// Process a decoded body (a single request or a batch).
    /// `None` means there is nothing to send back.
    fn handle_request(&self, body: Value, caller: Option<CallerAddress>) -> Option<Reply>;

    /// Number of registered methods, reported by the health endpoint.
    fn method_count(&self) -> usize {
        0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / response values
// ─────────────────────────────────────────────────────────────────────────────

/// One inbound HTTP call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub headers: HeaderMap,
    /// Peer address reported by the listener, if any.
    pub remote_addr: Option<IpAddr>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            remote_addr: None,
            body: Bytes::new(),
        }
    }

    /// A `POST` carrying `body` with a JSON-RPC content type.
    pub fn post_json(body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(RPC_CONTENT_TYPE))
            .with_body(body)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn without_header(mut self, name: HeaderName) -> Self {
        self.headers.remove(name);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

/// One outbound HTTP response: status line, headers, body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// JSON body with the JSON-RPC content type.
    pub fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        let (status, body) = match serde_json::to_vec(payload) {
            Ok(body) => (status, Bytes::from(body)),
            Err(e) => {
                error!("Failed to encode response body: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, Bytes::from_static(SERVER_ERROR_BODY.as_bytes()))
            }
        };
        Self::empty(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(RPC_CONTENT_TYPE))
            .with_body(body)
    }

    /// Error envelope with a null id.
    pub fn rpc_error(status: StatusCode, error: RpcError) -> Self {
        Self::json(status, &Response::error(None, error))
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// The body decoded as JSON, or `None` when empty or not JSON.
    pub fn json_body(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the HTTP gate sequence in front of a [`RequestHandler`].
pub struct HttpAdapter<H: RequestHandler> {
    handler: Arc<H>,
    cors: CorsPolicy,
    checks: CheckChain,
}

impl<H: RequestHandler> HttpAdapter<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            cors: CorsPolicy::default(),
            checks: CheckChain::new(),
        }
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    pub fn with_check<C: PreDispatchCheck + 'static>(mut self, check: C) -> Self {
        self.checks.add(check);
        self
    }

    pub fn with_checks(mut self, checks: CheckChain) -> Self {
        self.checks = checks;
        self
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Process one HTTP call.
    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        // Only allow the POST method; OPTIONS is a preflight probe
        if request.method == Method::OPTIONS {
            debug!("Answering preflight");
            return self.finish(request, self.preflight());
        }
        if request.method != Method::POST {
            debug!("Rejecting {} request", request.method);
            let response = HttpResponse::rpc_error(StatusCode::METHOD_NOT_ALLOWED, RpcError::only_post_allowed())
                .with_header(header::ALLOW, HeaderValue::from_static("POST"));
            return self.finish(request, response);
        }

        // Check headers
        match request.headers.get(header::CONTENT_TYPE) {
            Some(value) if is_rpc_media_type(value) => {}
            other => {
                debug!("Rejecting Content-Type {other:?}");
                let response =
                    HttpResponse::rpc_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, RpcError::bad_content_type());
                return self.finish(request, response);
            }
        }

        if let Some(accept) = request.headers.get(header::ACCEPT) {
            if !is_rpc_media_type(accept) {
                debug!("Rejecting Accept {accept:?}");
                let response = HttpResponse::rpc_error(StatusCode::NOT_ACCEPTABLE, RpcError::bad_accept());
                return self.finish(request, response);
            }
        }

        let caller = request.remote_addr.map(CallerAddress::from);

        // Pre-dispatch checks answer verbatim
        if let Some(response) = self.checks.run(request, caller.as_ref()) {
            return response;
        }

        let body = match decode_body(&request.body) {
            Ok(body) => body,
            Err(reason) => {
                debug!("Rejecting body: {reason}");
                let response = HttpResponse::rpc_error(StatusCode::BAD_REQUEST, RpcError::parse_error());
                return self.finish(request, response);
            }
        };

        let response = match self.handler.handle_request(body, caller) {
            Some(reply) => HttpResponse::json(StatusCode::OK, &reply),
            None => HttpResponse::empty(StatusCode::NO_CONTENT),
        };
        self.finish(request, response)
    }

    fn preflight(&self) -> HttpResponse {
        let mut response = HttpResponse::empty(StatusCode::OK)
            .with_header(header::ALLOW, HeaderValue::from_static("POST"))
            .with_header(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(PREFLIGHT_ALLOW_HEADERS),
            );
        self.cors.apply_preflight(&mut response.headers);
        response
    }

    fn finish(&self, request: &HttpRequest, mut response: HttpResponse) -> HttpResponse {
        self.cors
            .apply(request.headers.get(header::ORIGIN), &mut response.headers);
        response
    }
}

/// Whether `value` is an accepted media type, optionally followed by a single
/// `charset=` parameter. Matching is ASCII case-insensitive.
pub fn media_type_matches(value: &str) -> bool {
    let mut parts = value.split(';');
    let base = parts.next().unwrap_or_default().trim();

    match (parts.next(), parts.next()) {
        (None, _) => {}
        (Some(param), None) if is_charset_param(param) => {}
        _ => return false,
    }

    ACCEPTED_MEDIA_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(base))
}

fn is_charset_param(param: &str) -> bool {
    param
        .trim()
        .get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("charset="))
}

fn is_rpc_media_type(value: &HeaderValue) -> bool {
    value.to_str().map(media_type_matches).unwrap_or(false)
}

fn decode_body(body: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(body).map_err(|e| format!("invalid UTF-8: {e}"))?;
    serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))
}
