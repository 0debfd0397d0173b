//! Method registry: the fixed table of callable methods.
//!
//! Built once through [`RegistryBuilder`], validated, then shared read-only
//! by every call.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;

use rpcgate_protocol::HandlerResult;
use tracing::info;

use crate::binder::BoundParams;
use crate::context::CallContext;
use crate::error::ConfigError;

/// A method handler: call context plus bound parameters in, outcome out.
pub type Handler = Box<dyn Fn(&CallContext<'_>, &BoundParams) -> HandlerResult + Send + Sync>;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    /// Whether the handler supplies a value when the caller omits it.
    pub has_default: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_default: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_default: true,
        }
    }
}

/// A registered method: name, parameter schema and handler.
pub struct MethodDescriptor {
    name: String,
    params: Vec<ParamSpec>,
    handler: Handler,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Number of parameters the caller must supply.
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.has_default).count()
    }

    pub fn call(&self, ctx: &CallContext<'_>, params: &BoundParams) -> HandlerResult {
        (self.handler)(ctx, params)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyMethodName);
        }

        let mut seen = HashSet::new();
        let mut optional_seen = false;
        for param in &self.params {
            if param.name.is_empty() {
                return Err(ConfigError::EmptyParamName {
                    method: self.name.clone(),
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(ConfigError::DuplicateParam {
                    method: self.name.clone(),
                    param: param.name.clone(),
                });
            }
            if param.has_default {
                optional_seen = true;
            } else if optional_seen {
                return Err(ConfigError::RequiredAfterOptional {
                    method: self.name.clone(),
                    param: param.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Read-only name → descriptor table.
#[derive(Debug)]
pub struct MethodRegistry {
    methods: BTreeMap<String, MethodDescriptor>,
}

impl MethodRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Collects method declarations; [`RegistryBuilder::build`] validates them.
#[derive(Default)]
pub struct RegistryBuilder {
    methods: Vec<MethodDescriptor>,
}

impl RegistryBuilder {
    /// Declare a method.
    ///
    /// Parameters are declared in positional order. Parameters with a
    /// default must come after every required one.
    pub fn method<P, F>(mut self, name: impl Into<String>, params: P, handler: F) -> Self
    where
        P: IntoIterator<Item = ParamSpec>,
        F: Fn(&CallContext<'_>, &BoundParams) -> HandlerResult + Send + Sync + 'static,
    {
        self.methods.push(MethodDescriptor {
            name: name.into(),
            params: params.into_iter().collect(),
            handler: Box::new(handler),
        });
        self
    }

    pub fn build(self) -> Result<MethodRegistry, ConfigError> {
        let mut methods = BTreeMap::new();
        for descriptor in self.methods {
            descriptor.validate()?;
            if methods.contains_key(&descriptor.name) {
                return Err(ConfigError::DuplicateMethod(descriptor.name));
            }
            info!(
                "Registering method: {} ({} params, {} required)",
                descriptor.name,
                descriptor.params.len(),
                descriptor.required_count()
            );
            methods.insert(descriptor.name.clone(), descriptor);
        }
        Ok(MethodRegistry { methods })
    }
}
