//! TOML configuration shared by the bridge and the keystroke consumer.
//!
//! Both binaries read one TOML file at startup.  Every field carries a
//! `#[serde(default = "...")]` helper, so a partial file (or none at all)
//! yields a working configuration:
//!
//! ```toml
//! [mqtt]
//! broker = "localhost"
//! port = 1883
//! qos = 0
//!
//! [mqtt.reconnect]
//! initial_delay_ms = 500
//! max_delay_ms = 30000
//! ```
//!
//! The binary-specific sections (`[bridge]`, `input_topic`, ...) live in each
//! binary's own config type and embed [`MqttSettings`].

mod mqtt;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::reconnect::ReconnectPolicy;

/// Error type for loading and validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── QoS ───────────────────────────────────────────────────────────────────────

/// MQTT delivery guarantee, stored in config files as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QosLevel {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<u8> for QosLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(format!("QoS must be 0, 1 or 2, got {other}")),
        }
    }
}

impl From<QosLevel> for u8 {
    fn from(qos: QosLevel) -> u8 {
        match qos {
            QosLevel::AtMostOnce => 0,
            QosLevel::AtLeastOnce => 1,
            QosLevel::ExactlyOnce => 2,
        }
    }
}

impl std::fmt::Display for QosLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

// ── Broker settings ───────────────────────────────────────────────────────────

/// How to reach the MQTT broker and how to behave when it goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttSettings {
    /// Broker host name or IP address.
    #[serde(default = "default_broker")]
    pub broker: String,
    /// Broker TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// QoS used for publishing (bridge) or subscribing (consumer).
    #[serde(default)]
    pub qos: QosLevel,
    /// MQTT keep-alive interval in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Client ids are `<prefix>-<uuid>` so that several instances can share
    /// one broker.
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    /// Bound of the request channel between callers and the event loop.
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_broker() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_keep_alive_secs() -> u64 {
    60
}
fn default_client_id_prefix() -> String {
    "vam".to_string()
}
fn default_request_capacity() -> usize {
    64
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_port(),
            qos: QosLevel::default(),
            keep_alive_secs: default_keep_alive_secs(),
            client_id_prefix: default_client_id_prefix(),
            request_capacity: default_request_capacity(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl MqttSettings {
    /// Rejects values that would make the MQTT client misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "mqtt.broker",
                reason: "must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "mqtt.port",
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        // rumqttc rejects keep-alive intervals below five seconds.
        if self.keep_alive_secs < 5 {
            return Err(ConfigError::Invalid {
                field: "mqtt.keep_alive_secs",
                reason: format!("must be at least 5, got {}", self.keep_alive_secs),
            });
        }
        if self.request_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "mqtt.request_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads a TOML config file.
///
/// When `explicit` is given the file must exist.  Otherwise `default_path`
/// is tried and, if it does not exist, `T::default()` is returned.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors (including a missing
/// explicit file) and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_toml<T>(explicit: Option<&Path>, default_path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let path = explicit.unwrap_or(default_path);

    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
            debug!(path = %path.display(), "config file not found; using defaults");
            Ok(T::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
