//! Gateway configuration with validation.
//!
//! Sources, later wins: built-in defaults, an optional TOML file named by
//! `GATEWAY_CONFIG`, then environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public HTTP server
    pub http: HttpConfig,
    /// Health/metrics server (localhost only by default)
    pub admin: AdminConfig,
    /// Shared-secret credentials
    pub auth: AuthConfig,
    /// Serializer limits
    pub serializer: SerializerConfig,
    /// Additional redaction rules merged into the built-in policy
    pub redaction: RedactionConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.username.trim().is_empty() || self.auth.password.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        if self.http.enabled && self.admin.enabled && self.http.port == self.admin.port {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.serializer.max_depth == 0 {
            return Err(ConfigError::InvalidLimit("max_depth cannot be 0".into()));
        }

        Ok(())
    }

    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Defaults, then `GATEWAY_CONFIG` (if set), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("GATEWAY_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Environment overrides.
    ///
    /// - `GATEWAY_HTTP_HOST`, `GATEWAY_HTTP_PORT`
    /// - `GATEWAY_ADMIN_PORT`, `GATEWAY_ADMIN_ENABLED`
    /// - `GATEWAY_AUTH_USERNAME`, `GATEWAY_AUTH_PASSWORD`
    /// - `GATEWAY_MAX_DEPTH`
    pub fn apply_env(&mut self) {
        if let Some(host) = env_parse::<IpAddr>("GATEWAY_HTTP_HOST") {
            self.http.host = host;
        }
        if let Some(port) = env_parse::<u16>("GATEWAY_HTTP_PORT") {
            self.http.port = port;
        }
        if let Some(port) = env_parse::<u16>("GATEWAY_ADMIN_PORT") {
            self.admin.port = port;
        }
        if let Some(enabled) = env_parse::<bool>("GATEWAY_ADMIN_ENABLED") {
            self.admin.enabled = enabled;
        }
        if let Ok(username) = env::var("GATEWAY_AUTH_USERNAME") {
            self.auth.username = username;
        }
        if let Ok(password) = env::var("GATEWAY_AUTH_PASSWORD") {
            self.auth.password = password;
        }
        if let Some(depth) = env_parse::<usize>("GATEWAY_MAX_DEPTH") {
            self.serializer.max_depth = depth;
        }
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Get Admin server bind address
    pub fn admin_addr(&self) -> SocketAddr {
        SocketAddr::new(self.admin.host, self.admin.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            enabled: true,
        }
    }
}

/// Admin server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bind address (localhost only by default)
    pub host: IpAddr,
    /// Port (default: 9090)
    pub port: u16,
    /// Enable admin server
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9090,
            enabled: true,
        }
    }
}

/// The configured secret pair every request must present via HTTP Basic auth
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Serializer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Maximum nesting depth before the object graph is rejected
    pub max_depth: usize,
    /// Pretty-print response documents
    pub pretty: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            pretty: true,
        }
    }
}

/// Extra redaction rules, keyed by canonical type name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Fields removed for the type and every subtype
    pub blacklist: HashMap<String, Vec<String>>,
    /// Fields removed for the exact type only
    pub excluded: HashMap<String, Vec<String>>,
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The shared secret is not configured
    #[error("auth.username and auth.password must both be set")]
    MissingSecret,
    /// HTTP and admin servers on the same port
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// TOML could not be parsed
    #[error("invalid configuration file: {0}")]
    Parse(String),
    /// Configuration file could not be read
    #[error("cannot read configuration: {0}")]
    Io(String),
}
