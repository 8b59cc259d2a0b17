//! Configuration types for the metadata service
//!
//! Every section deserializes with defaults, so an empty file (or no file at
//! all) yields a runnable development configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
    pub identity: IdentityConfig,
    pub authorization: AuthorizationConfig,
    pub logging: LoggingConfig,
}

/// Deployment environment. Production masks internal error details.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// HTTP listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Maximum accepted request body
    pub body_limit_bytes: usize,
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            body_limit_bytes: 50 * 1024 * 1024, // 50 MB
            environment: Environment::Development,
        }
    }
}

/// Which store implementation backs the service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Redb,
}

/// Metadata store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file for the redb backend
    pub path: PathBuf,
    /// Attempts to open the database before giving up
    pub open_retries: u32,
    pub retry_backoff_ms: u64,
}

impl StoreConfig {
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redb,
            path: PathBuf::from("./data/metadata.redb"),
            open_retries: 10,
            retry_backoff_ms: 5000,
        }
    }
}

/// Ownership gateway (resource service) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL; resources are fetched from `{url}/{type}/{id}`
    pub url: String,
    /// Service token sent as a bearer credential
    pub token: Option<String>,
    /// Request timeout; unset waits for the registry indefinitely
    pub timeout_ms: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000/v1".to_string(),
            token: None,
            timeout_ms: None,
        }
    }
}

/// Identity resolver configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL of the identity service. Unset means every request is anonymous.
    pub url: Option<String>,
    pub path: String,
    pub timeout_ms: Option<u64>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: "/auth/user/me".to_string(),
            timeout_ms: Some(5000),
        }
    }
}

/// Authorization tuning
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Also require `application` on DELETE, not just `language`
    pub delete_requires_application: bool,
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
