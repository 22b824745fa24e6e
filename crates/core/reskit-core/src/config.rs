//! Configuration management and environment variable loading

use crate::{ReskitError, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default service address when `RESKIT_BASE_URL` is unset
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Load environment variables from a .env file
///
/// Looks in the current directory and its parents. A missing file is not an
/// error; a malformed one is.
///
/// # Example
///
/// ```no_run
/// use reskit_core::load_env;
///
/// load_env().ok();
/// let base = std::env::var("RESKIT_BASE_URL").unwrap_or_default();
/// ```
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("✓ Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(ReskitError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(ReskitError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Load environment variables from a specific file
pub fn load_env_from_path<P: AsRef<Path>>(path: P) -> Result<()> {
    match dotenvy::from_path(path.as_ref()) {
        Ok(_) => {
            tracing::info!("✓ Loaded environment from: {}", path.as_ref().display());
            Ok(())
        }
        Err(e) => Err(ReskitError::config(format!(
            "Failed to load {} environment file: {}",
            path.as_ref().display(),
            e
        ))),
    }
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as boolean
pub fn get_env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Connection settings shared by the HTTP client and the live channel
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, e.g. `http://127.0.0.1:5000`
    pub base_url: url::Url,
    /// Where the auth token is persisted
    pub token_path: PathBuf,
    /// Per-request timeout for HTTP calls
    pub request_timeout: Duration,
    /// Timeout for opening the live channel
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Build a config for the given base URL with default timeouts
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| ReskitError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ReskitError::config(format!(
                "Base URL must be http or https, got '{}'",
                base_url.scheme()
            )));
        }
        Ok(Self {
            base_url,
            token_path: default_token_path(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        })
    }

    /// Read the config from `RESKIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(&get_env_or("RESKIT_BASE_URL", DEFAULT_BASE_URL))?;
        if let Ok(path) = env::var("RESKIT_TOKEN_FILE") {
            config.token_path = PathBuf::from(path);
        }
        config.request_timeout =
            Duration::from_secs(get_env_int("RESKIT_HTTP_TIMEOUT_SECS", 30u64));
        config.connect_timeout =
            Duration::from_secs(get_env_int("RESKIT_CONNECT_TIMEOUT_SECS", 10u64));
        Ok(config)
    }

    /// Override the token location
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Resolve an endpoint such as `/api/projects` against the base URL
    pub fn endpoint(&self, path: &str) -> Result<url::Url> {
        self.base_url
            .join(path)
            .map_err(|e| ReskitError::config(format!("Invalid endpoint '{}': {}", path, e)))
    }
}

fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".reskit")
        .join("token")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_bool() {
        env::set_var("RESKIT_TEST_BOOL_TRUE", "true");
        env::set_var("RESKIT_TEST_BOOL_0", "0");

        assert!(get_env_bool("RESKIT_TEST_BOOL_TRUE", false));
        assert!(!get_env_bool("RESKIT_TEST_BOOL_0", true));
        assert!(get_env_bool("RESKIT_NONEXISTENT", true));

        env::remove_var("RESKIT_TEST_BOOL_TRUE");
        env::remove_var("RESKIT_TEST_BOOL_0");
    }

    #[test]
    fn test_get_env_int() {
        env::set_var("RESKIT_TEST_INT", "42");
        assert_eq!(get_env_int("RESKIT_TEST_INT", 0), 42);
        assert_eq!(get_env_int("RESKIT_NONEXISTENT", 99), 99);
        env::remove_var("RESKIT_TEST_INT");
    }

    #[test]
    fn test_endpoint_join() {
        let config = ClientConfig::new("http://localhost:5000").unwrap();
        assert_eq!(
            config.endpoint("/api/read-messages/42").unwrap().as_str(),
            "http://localhost:5000/api/read-messages/42"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(ClientConfig::new("ftp://example.com").is_err());
        assert!(ClientConfig::new("not a url").is_err());
    }

    #[test]
    fn test_token_path_override() {
        let config = ClientConfig::new(DEFAULT_BASE_URL)
            .unwrap()
            .with_token_path("/tmp/reskit-token");
        assert_eq!(config.token_path, PathBuf::from("/tmp/reskit-token"));
    }
}
