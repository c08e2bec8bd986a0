//! Domain layer for vam-keyemu.
//!
//! The key-sequence grammar itself lives in `vam-core`; this module only
//! holds the consumer's configuration.

pub mod config;

pub use config::{KeyemuConfig, KeyemuMqttConfig, DEFAULT_INPUT_TOPIC};
