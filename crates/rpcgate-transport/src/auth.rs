//! Bearer token authentication as a pre-dispatch check.
//!
//! Protocol flow:
//!   1. Client sends `Authorization: Bearer <token>` with every POST
//!   2. Missing header → 401, error -32010 "Not authenticated"
//!   3. Wrong token → 401, error -32011 "Invalid authentication token"
//!   4. Matching token → the call proceeds to body decoding

use axum::http::{HeaderValue, StatusCode, header};
use constant_time_eq::constant_time_eq;
use rpcgate_protocol::{CallerAddress, RpcError, RpcErrorCode};
use tracing::warn;

use crate::adapter::{HttpRequest, HttpResponse};
use crate::checks::PreDispatchCheck;

// ─────────────────────────────────────────────────────────────────────────────
// Error Codes
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication-specific error codes (-32010 to -32019).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// No credentials were presented
    NotAuthenticated,
    /// Credentials were presented but did not match
    InvalidToken,
}

impl AuthErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            Self::NotAuthenticated => -32010,
            Self::InvalidToken => -32011,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Not authenticated",
            Self::InvalidToken => "Invalid authentication token",
        }
    }

    pub fn to_error(self) -> RpcError {
        RpcError::new(RpcErrorCode::Custom(self.code()), self.message())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Check
// ─────────────────────────────────────────────────────────────────────────────

/// Requires `Authorization: Bearer <token>` on every call.
#[derive(Debug, Clone)]
pub struct BearerTokenCheck {
    token: String,
}

impl BearerTokenCheck {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    fn reject(code: AuthErrorCode) -> HttpResponse {
        HttpResponse::rpc_error(StatusCode::UNAUTHORIZED, code.to_error())
            .with_header(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))
    }
}

impl PreDispatchCheck for BearerTokenCheck {
    fn check(&self, request: &HttpRequest, caller: Option<&CallerAddress>) -> Option<HttpResponse> {
        let presented = request
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token);

        match presented {
            None => {
                warn!("Unauthenticated call from {}", display_caller(caller));
                Some(Self::reject(AuthErrorCode::NotAuthenticated))
            }
            Some(token) if constant_time_eq(token.as_bytes(), self.token.as_bytes()) => None,
            Some(_) => {
                warn!("Invalid token from {}", display_caller(caller));
                Some(Self::reject(AuthErrorCode::InvalidToken))
            }
        }
    }

    fn name(&self) -> &str {
        "bearer-token"
    }

    fn priority(&self) -> i32 {
        -100
    }
}

fn display_caller(caller: Option<&CallerAddress>) -> String {
    caller.map_or_else(|| "unknown caller".to_string(), |c| c.to_string())
}

/// The credentials of a `Bearer` authorization value. The scheme name is
/// case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("Bearer").then(|| token.trim())
}
