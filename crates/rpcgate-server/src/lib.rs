//! rpcgate server: method registry, parameter binding and dispatch.
//!
//! The server owns the registry and provides the `RequestHandler`
//! implementation for the transport layer.

pub mod binder;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod registry;

pub use binder::{BoundParams, bind};
pub use context::CallContext;
pub use dispatcher::RpcServer;
pub use error::ConfigError;
pub use registry::{Handler, MethodDescriptor, MethodRegistry, ParamSpec, RegistryBuilder};
