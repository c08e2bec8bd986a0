//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is read once at startup from a TOML file (every field optional), then
//! command-line flags override individual values:
//!
//! ```toml
//! [bridge]
//! bind_address = "0.0.0.0"
//! port = 39340
//! log_level = "info"
//!
//! [bridge.framing]
//! mode = "newline"        # or "chunk" (default)
//!
//! [mqtt]
//! broker = "localhost"
//! port = 1883
//! topic = "/namespace/vam"
//! ```
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! variable reads inside the domain) makes the bridge easy to embed in tests.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vam_core::{ConfigError, FramingPolicy, MqttSettings};

/// Topic matching messages are published to when none is configured.
pub const DEFAULT_TOPIC: &str = "/namespace/vam";

/// All runtime configuration for the bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub bridge: ListenerConfig,
    #[serde(default)]
    pub mqtt: BridgeMqttConfig,
}

/// The `[bridge]` table: where to listen and how to cut messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Pending-connection queue length passed to `listen(2)`.
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// How long in-flight connections may keep running after shutdown is
    /// requested before they are aborted.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub framing: FramingPolicy,
}

/// The `[mqtt]` table: broker settings plus the outbound topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMqttConfig {
    #[serde(flatten)]
    pub connection: MqttSettings,
    #[serde(default = "default_topic")]
    pub topic: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    39340
}
fn default_backlog() -> u32 {
    128
}
fn default_shutdown_grace_secs() -> u64 {
    2
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            backlog: default_backlog(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            log_level: default_log_level(),
            framing: FramingPolicy::default(),
        }
    }
}

impl Default for BridgeMqttConfig {
    fn default() -> Self {
        Self {
            connection: MqttSettings::default(),
            topic: default_topic(),
        }
    }
}

impl BridgeConfig {
    /// Socket address the listener binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `bind_address` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bridge
            .bind_address
            .parse()
            .map_err(|e| ConfigError::Invalid {
                field: "bridge.bind_address",
                reason: format!("'{}': {e}", self.bridge.bind_address),
            })?;
        Ok(SocketAddr::new(ip, self.bridge.port))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.bridge.shutdown_grace_secs)
    }

    /// Checks every value that cannot be enforced by the type system.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.mqtt.connection.validate()?;

        let topic = &self.mqtt.topic;
        if topic.is_empty() || topic.contains(&['+', '#'][..]) {
            return Err(ConfigError::Invalid {
                field: "mqtt.topic",
                reason: format!("'{topic}' is not a valid publish topic"),
            });
        }
        if self.bridge.framing.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                field: "bridge.framing.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.bridge.framing.max_frame_len == 0 {
            return Err(ConfigError::Invalid {
                field: "bridge.framing.max_frame_len",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
