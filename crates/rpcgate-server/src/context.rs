//! Call context: what a handler knows about the call besides its parameters.

use rpcgate_protocol::{CallerAddress, RequestId};

use crate::registry::MethodRegistry;

/// Execution context handed to every method handler.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// Name the method was invoked under
    pub method: &'a str,
    /// Request id; `None` for notifications
    pub id: Option<&'a RequestId>,
    /// Peer address of the HTTP call, when the listener reported one
    pub caller: Option<CallerAddress>,
    /// The registry the call was dispatched through
    pub registry: &'a MethodRegistry,
}

impl CallContext<'_> {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}
