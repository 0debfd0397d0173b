//! RPC server: validates, routes and invokes JSON-RPC requests.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rpcgate_protocol::{
    CallerAddress, HandlerResult, Params, Reply, RequestEnvelope, RequestId, Response, RpcError,
};
use rpcgate_transport::RequestHandler;
use serde_json::Value;
use tracing::{debug, warn};

use crate::binder;
use crate::context::CallContext;
use crate::registry::{MethodDescriptor, MethodRegistry};

/// The RPC server: owns the method registry and answers requests.
#[derive(Debug, Clone)]
pub struct RpcServer {
    registry: Arc<MethodRegistry>,
}

impl RpcServer {
    pub fn new(registry: MethodRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// Process a decoded body: an array is a batch, anything else a single
    /// request. `None` means no content.
    pub fn process(&self, body: Value, caller: Option<CallerAddress>) -> Option<Reply> {
        match body {
            Value::Array(items) => self.process_batch(items, caller).map(Reply::Batch),
            single => self.process_request(single, caller).map(Reply::Single),
        }
    }

    /// Process each element in order. Elements without a response are
    /// omitted; an all-empty result (or an empty batch) is no content.
    pub fn process_batch(
        &self,
        items: Vec<Value>,
        caller: Option<CallerAddress>,
    ) -> Option<Vec<Response>> {
        debug!("Processing batch of {} requests", items.len());
        let responses: Vec<Response> = items
            .into_iter()
            .filter_map(|item| self.process_request(item, caller))
            .collect();
        (!responses.is_empty()).then_some(responses)
    }

    /// Process one candidate request.
    ///
    /// An invalid envelope is always answered, with a null id. Every other
    /// outcome of a notification is dropped after the handler has run.
    pub fn process_request(
        &self,
        candidate: Value,
        caller: Option<CallerAddress>,
    ) -> Option<Response> {
        let envelope = match RequestEnvelope::from_value(candidate) {
            Ok(envelope) => envelope,
            Err(error) => {
                debug!("Rejecting invalid request envelope");
                return Some(Response::error(None, error));
            }
        };

        let RequestEnvelope { method, params, id, .. } = envelope;
        let result = self.dispatch(&method, params, id.as_ref(), caller);

        match id {
            Some(id) => Some(Response::from_result(id, result)),
            None => {
                debug!("Notification '{method}' handled, response suppressed");
                None
            }
        }
    }

    fn dispatch(
        &self,
        method: &str,
        params: Params,
        id: Option<&RequestId>,
        caller: Option<CallerAddress>,
    ) -> HandlerResult {
        let Some(descriptor) = self.registry.get(method) else {
            debug!("Method not found: {method}");
            return Err(RpcError::method_not_found());
        };

        let bound = binder::bind(descriptor, params)?;
        let ctx = CallContext {
            method,
            id,
            caller,
            registry: &self.registry,
        };

        debug!("Dispatching {method} ({} params)", bound.len());
        invoke(descriptor, &ctx, &bound)
    }
}

/// Run the handler, turning a panic into `ServerError`.
fn invoke(
    descriptor: &MethodDescriptor,
    ctx: &CallContext<'_>,
    params: &binder::BoundParams,
) -> HandlerResult {
    panic::catch_unwind(AssertUnwindSafe(|| descriptor.call(ctx, params))).unwrap_or_else(|payload| {
        warn!(
            "Handler '{}' panicked: {}",
            descriptor.name(),
            panic_message(payload.as_ref())
        );
        Err(RpcError::server_error())
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

impl RequestHandler for RpcServer {
    fn handle_request(&self, body: Value, caller: Option<CallerAddress>) -> Option<Reply> {
        self.process(body, caller)
    }

    fn method_count(&self) -> usize {
        self.registry.len()
    }
}
