//! Keystroke consumer configuration.
//!
//! ```toml
//! log_level = "info"
//!
//! [mqtt]
//! broker = "localhost"
//! port = 1883
//! input_topic = "/namespace/vam"
//! qos = 1
//! ```
//!
//! Every field is optional.  Command-line flags override the file.

use serde::{Deserialize, Serialize};
use vam_core::{ConfigError, MqttSettings};

/// Topic subscribed to when none is configured.  Same as the bridge's
/// publish topic.
pub const DEFAULT_INPUT_TOPIC: &str = "/namespace/vam";

/// All runtime configuration for the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyemuConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub mqtt: KeyemuMqttConfig,
}

/// The `[mqtt]` table: broker settings plus the subscription topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyemuMqttConfig {
    #[serde(flatten)]
    pub connection: MqttSettings,
    #[serde(default = "default_input_topic")]
    pub input_topic: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_input_topic() -> String {
    DEFAULT_INPUT_TOPIC.to_string()
}

impl Default for KeyemuConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            mqtt: KeyemuMqttConfig::default(),
        }
    }
}

impl Default for KeyemuMqttConfig {
    fn default() -> Self {
        Self {
            connection: MqttSettings {
                client_id_prefix: "vam-keyemu".to_string(),
                ..MqttSettings::default()
            },
            input_topic: default_input_topic(),
        }
    }
}

impl KeyemuConfig {
    /// Checks every value that cannot be enforced by the type system.
    ///
    /// Wildcards are allowed in `input_topic`; it is a subscription filter.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mqtt.connection.validate()?;
        if self.mqtt.input_topic.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "mqtt.input_topic",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
