//! Matching of rate-limited authentication endpoints.

/// Matches a path against a fixed endpoint list, nested routes included.
#[derive(Debug, Clone)]
pub struct SensitiveEndpointMatcher {
    endpoints: Vec<String>,
}

impl SensitiveEndpointMatcher {
    pub fn new(endpoints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            endpoints: endpoints
                .into_iter()
                .map(|e| e.into().trim_end_matches('/').to_string())
                .collect(),
        }
    }

    /// True if `path` equals an endpoint or lies beneath it.
    pub fn matches(&self, path: &str) -> bool {
        self.endpoints.iter().any(|endpoint| is_within(path, endpoint))
    }
}

/// `path == prefix` or `path` starts with `"{prefix}/"`.
pub(crate) fn is_within(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
