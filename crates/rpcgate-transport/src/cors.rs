//! CORS (Cross-Origin Resource Sharing) policy.

use axum::http::{HeaderMap, HeaderValue, header};

/// Which origins may read responses from a browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsPolicy {
    /// No `Access-Control-Allow-Origin` header at all.
    #[default]
    Disabled,
    /// `Access-Control-Allow-Origin: *`
    Any,
    /// Reflect the request's `Origin` when it is one of these.
    Origins(Vec<String>),
}

impl CorsPolicy {
    /// Build a policy from configured origins. No origins disables CORS;
    /// a `*` entry allows any origin.
    pub fn from_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Vec<String> = origins
            .into_iter()
            .map(|o| {
                let o: String = o.into();
                o.trim().trim_end_matches('/').to_string()
            })
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() {
            Self::Disabled
        } else if origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::Origins(origins)
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// The `Access-Control-Allow-Origin` value for a request from `origin`.
    pub fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        match self {
            Self::Disabled => None,
            Self::Any => Some(HeaderValue::from_static("*")),
            Self::Origins(allowed) => {
                let origin = origin?;
                let text = origin.to_str().ok()?;
                allowed
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(text))
                    .then(|| origin.clone())
            }
        }
    }

    /// Attach the allow-origin header (and `Vary: Origin` when reflecting).
    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        if let Some(value) = self.allow_origin(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if matches!(self, Self::Origins(_)) {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// Extra headers for a preflight response.
    pub fn apply_preflight(&self, headers: &mut HeaderMap) {
        if !self.is_enabled() {
            return;
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    }
}
