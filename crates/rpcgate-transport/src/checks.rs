//! Pre-dispatch checks.
//!
//! A check sees the HTTP call after the method and header gates and before
//! the body is decoded. It can let the call through or answer it outright;
//! an answer is sent verbatim. Checks run in priority order.

use rpcgate_protocol::CallerAddress;
use tracing::debug;

use crate::adapter::{HttpRequest, HttpResponse};

/// Trait for pre-dispatch checks (authentication, access control, ...).
pub trait PreDispatchCheck: Send + Sync {
    /// `Some(response)` short-circuits the call with that response.
    fn check(&self, request: &HttpRequest, caller: Option<&CallerAddress>) -> Option<HttpResponse>;

    /// Check name for debugging.
    fn name(&self) -> &str;

    /// Priority (lower runs first).
    fn priority(&self) -> i32 {
        0
    }
}

/// A chain of checks executed in priority order.
pub struct CheckChain {
    checks: Vec<Box<dyn PreDispatchCheck>>,
}

impl CheckChain {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn add<C: PreDispatchCheck + 'static>(&mut self, check: C) {
        self.checks.push(Box::new(check));
        self.checks.sort_by_key(|c| c.priority());
    }

    /// First short-circuit response, if any check produces one.
    pub fn run(&self, request: &HttpRequest, caller: Option<&CallerAddress>) -> Option<HttpResponse> {
        self.checks.iter().find_map(|check| {
            let response = check.check(request, caller)?;
            debug!("Call answered by check '{}' ({})", check.name(), response.status);
            Some(response)
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CheckChain {
    fn default() -> Self {
        Self::new()
    }
}
