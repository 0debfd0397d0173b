//! Parameter binding: matches supplied params against a method's schema.

use rpcgate_protocol::{Params, RpcError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::registry::MethodDescriptor;

/// Supplied parameter values keyed by declared name, in declaration order.
///
/// Parameters the caller omitted are absent; the handler resolves their
/// defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParams {
    values: Vec<(String, Value)>,
}

impl BoundParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Deserialize a supplied value. Absent or ill-typed → `InvalidParams`.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, RpcError> {
        let value = self.get(name).ok_or_else(RpcError::invalid_params)?;
        convert(name, value)
    }

    /// Deserialize a value if it was supplied.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, RpcError> {
        self.get(name).map(|value| convert(name, value)).transpose()
    }

    /// Deserialize a value, falling back to `default` when omitted.
    pub fn get_or<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, RpcError> {
        Ok(self.optional(name)?.unwrap_or(default))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn convert<T: DeserializeOwned>(name: &str, value: &Value) -> Result<T, RpcError> {
    T::deserialize(value).map_err(|e| {
        debug!("Parameter '{name}' has the wrong shape: {e}");
        RpcError::invalid_params()
    })
}

/// Bind `params` to the descriptor's declared parameters.
pub fn bind(descriptor: &MethodDescriptor, params: Params) -> Result<BoundParams, RpcError> {
    let declared = descriptor.params();
    let required = descriptor.required_count();

    let values = match params {
        Params::Positional(values) => {
            if values.len() < required || values.len() > declared.len() {
                debug!(
                    "{}: got {} positional params, expected {}..={}",
                    descriptor.name(),
                    values.len(),
                    required,
                    declared.len()
                );
                return Err(RpcError::invalid_params());
            }
            declared
                .iter()
                .zip(values)
                .map(|(param, value)| (param.name.clone(), value))
                .collect()
        }
        Params::Named(mut map) => {
            if let Some(unknown) = map.keys().find(|k| !declared.iter().any(|p| &p.name == *k)) {
                debug!("{}: unknown param '{}'", descriptor.name(), unknown);
                return Err(RpcError::invalid_params());
            }
            let mut values = Vec::with_capacity(map.len());
            for param in declared {
                match map.remove(&param.name) {
                    Some(value) => values.push((param.name.clone(), value)),
                    None if param.has_default => {}
                    None => {
                        debug!("{}: missing param '{}'", descriptor.name(), param.name);
                        return Err(RpcError::invalid_params());
                    }
                }
            }
            values
        }
    };

    Ok(BoundParams { values })
}
