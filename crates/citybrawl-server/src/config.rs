use std::path::PathBuf;

use serde::Deserialize;

use citybrawl_core::net::protocol::MAX_MESSAGE_SIZE;

/// Config file read when `CITYBRAWL_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "citybrawl.toml";

/// Top-level server configuration, loaded from `citybrawl.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Directory holding the browser client; served for every non-API path.
    pub web_root: String,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Outbound frames queued per connection before broadcasts skip it.
    pub player_message_buffer: usize,
    /// Inbound frames per second per connection (also the burst size).
    pub ws_rate_limit_per_sec: f64,
    /// Inbound frames larger than this are dropped.
    pub max_message_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
            ws_rate_limit_per_sec: 120.0,
            max_message_size: 16 * 1024,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    InvalidListenAddr(String),
    ZeroLimit(&'static str),
    InvalidRateLimit(f64),
    MessageSizeTooLarge(usize),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidListenAddr(addr) => {
                write!(f, "listen_addr `{addr}` is not a valid socket address")
            },
            Self::ZeroLimit(field) => write!(f, "limits.{field} must be > 0"),
            Self::InvalidRateLimit(rate) => {
                write!(f, "limits.ws_rate_limit_per_sec must be > 0 (got {rate})")
            },
            Self::MessageSizeTooLarge(size) => write!(
                f,
                "limits.max_message_size {size} exceeds protocol maximum {MAX_MESSAGE_SIZE}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Check the configuration for values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen_addr.clone()));
        }

        if self.limits.max_ws_connections == 0 {
            return Err(ConfigError::ZeroLimit("max_ws_connections"));
        }
        if self.limits.player_message_buffer == 0 {
            return Err(ConfigError::ZeroLimit("player_message_buffer"));
        }
        if self.limits.max_message_size == 0 {
            return Err(ConfigError::ZeroLimit("max_message_size"));
        }
        if self.limits.max_message_size > MAX_MESSAGE_SIZE {
            return Err(ConfigError::MessageSizeTooLarge(
                self.limits.max_message_size,
            ));
        }
        let rate = self.limits.ws_rate_limit_per_sec;
        if rate.is_nan() || rate <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(rate));
        }

        Ok(())
    }

    /// Load config from `citybrawl.toml` (or `CITYBRAWL_CONFIG`) if it exists,
    /// then apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("CITYBRAWL_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        "Failed to parse config: {e}, using defaults"
                    );
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                ServerConfig::default()
            },
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("CITYBRAWL_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("CITYBRAWL_WEB_ROOT")
            && !root.is_empty()
        {
            self.web_root = root;
        }
        if let Ok(val) = std::env::var("CITYBRAWL_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("CITYBRAWL_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.ws_rate_limit_per_sec = n;
        }
    }
}
