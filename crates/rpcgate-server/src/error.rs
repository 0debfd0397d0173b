//! Registry construction errors.

use thiserror::Error;

/// A malformed method table, detected before serving starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("method '{0}' is registered more than once")]
    DuplicateMethod(String),

    #[error("method names must not be empty")]
    EmptyMethodName,

    #[error("method '{method}' declares parameter '{param}' more than once")]
    DuplicateParam { method: String, param: String },

    #[error("method '{method}' declares a parameter with an empty name")]
    EmptyParamName { method: String },

    #[error("method '{method}': required parameter '{param}' follows a parameter with a default")]
    RequiredAfterOptional { method: String, param: String },
}
