//! Configuration for buyline-daemon

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuylineConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ad server adapter configuration
    #[serde(default)]
    pub adserver: AdServerConfig,

    /// Notification configuration
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connect_timeout")]
        connect_timeout_secs: u64,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

/// Ad server adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AdServerConfig {
    /// Simulated backend with optional failure injection
    Simulated {
        /// Make every order creation fail
        #[serde(default)]
        fail_create: bool,

        /// Make every order activation fail
        #[serde(default)]
        fail_activate: bool,
    },
}

impl Default for AdServerConfig {
    fn default() -> Self {
        AdServerConfig::Simulated {
            fail_create: false,
            fail_activate: false,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Operator chat webhook URL. Unset disables chat notices.
    #[serde(default)]
    pub chat_webhook_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
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

fn default_listen_addr() -> SocketAddr {
    // Loopback only by default; deployments override via config or env.
    "127.0.0.1:8080".parse().unwrap_or_else(|_| {
        SocketAddr::from(([127, 0, 0, 1], 8080))
    })
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BuylineConfig {
    /// Load configuration: defaults, then an optional file, then
    /// environment variables with the `BUYLINE_` prefix.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&BuylineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BUYLINE")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuylineConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert!(matches!(
            config.adserver,
            AdServerConfig::Simulated {
                fail_create: false,
                fail_activate: false,
            }
        ));
        assert!(config.notifications.chat_webhook_url.is_none());
    }

    #[test]
    fn test_storage_config_is_tagged() {
        let raw = r#"{"type": "postgres", "url": "postgres://localhost/buyline"}"#;
        let parsed: StorageConfig = serde_json::from_str(raw).unwrap();
        match parsed {
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => {
                assert_eq!(url, "postgres://localhost/buyline");
                assert_eq!(max_connections, 10);
                assert_eq!(connect_timeout_secs, 5);
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = BuylineConfig::load(None).unwrap();
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.logging.level, "info");
    }
}
