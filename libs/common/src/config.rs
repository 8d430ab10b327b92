//! Client configuration shared by every service talking to the backend

use std::env;
use std::time::Duration;

/// Backend connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the movie-review backend, without trailing slash
    pub backend_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    /// Create a new ClientConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BACKEND_URL`: Backend base URL (default: "http://10.0.2.2:5000")
    /// - `BACKEND_TIMEOUT_SECS`: Request timeout in seconds (default: 15)
    pub fn from_env() -> Self {
        let backend_url =
            env::var("BACKEND_URL").unwrap_or_else(|_| "http://10.0.2.2:5000".to_string());

        let request_timeout_secs = env::var("BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);

        Self::new(backend_url, request_timeout_secs)
    }

    pub fn new(backend_url: impl Into<String>, request_timeout_secs: u64) -> Self {
        let backend_url = backend_url.into().trim_end_matches('/').to_string();
        Self {
            backend_url,
            request_timeout_secs,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join a path onto the backend URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.backend_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_client_config_defaults() {
        unsafe {
            env::remove_var("BACKEND_URL");
            env::remove_var("BACKEND_TIMEOUT_SECS");
        }

        let config = ClientConfig::from_env();
        assert_eq!(config.backend_url, "http://10.0.2.2:5000");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    #[serial]
    fn test_client_config_from_env_with_custom_values() {
        unsafe {
            env::set_var("BACKEND_URL", "https://reviews.example.com/");
            env::set_var("BACKEND_TIMEOUT_SECS", "3");
        }

        let config = ClientConfig::from_env();
        assert_eq!(config.backend_url, "https://reviews.example.com");
        assert_eq!(config.request_timeout_secs, 3);

        unsafe {
            env::remove_var("BACKEND_URL");
            env::remove_var("BACKEND_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_endpoint_joins_single_slash() {
        let config = ClientConfig::new("http://localhost:5000/", 15);
        assert_eq!(config.endpoint("/genres"), "http://localhost:5000/genres");
        assert_eq!(
            config.endpoint("recommended/user/"),
            "http://localhost:5000/recommended/user/"
        );
    }
}
