//! Client configuration.

use std::time::Duration;

/// Default back-end API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// First temporary id handed to resources created through `save`.
pub const DEFAULT_TEMP_ID_START: i64 = -100;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL; request paths are resolved against it.
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,

    /// Temporary id of the first new resource in a `save` batch. Each further
    /// new resource counts down from it.
    pub temp_id_start: i64,
}

impl ClientConfig {
    /// Create a new client configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            headers: vec![("Crnk-Compact".to_string(), "true".to_string())],
            temp_id_start: DEFAULT_TEMP_ID_START,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header sent with every request, replacing one with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Set the first temporary id.
    pub fn with_temp_id_start(mut self, start: i64) -> Self {
        self.temp_id_start = start;
        self
    }

    /// Resolve a request path against the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.temp_id_start, -100);
        assert_eq!(
            config.headers,
            vec![("Crnk-Compact".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("https://dina.example.org/api/")
            .with_timeout(Duration::from_secs(5))
            .with_header("crnk-compact", "false")
            .with_header("Authorization", "Bearer abc")
            .with_temp_id_start(-1);

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.temp_id_start, -1);
        assert_eq!(config.headers.len(), 2);
        assert_eq!(config.headers[0], ("crnk-compact".into(), "false".into()));
    }

    #[test]
    fn test_url_joins_one_slash() {
        let config = ClientConfig::new("http://host/api/");
        assert_eq!(
            config.url("/collection-api/material-sample"),
            "http://host/api/collection-api/material-sample"
        );
        assert_eq!(config.url("operations"), "http://host/api/operations");
    }
}
