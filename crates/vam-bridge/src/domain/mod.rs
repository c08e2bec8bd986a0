//! Domain layer for vam-bridge.
//!
//! Pure configuration types with no I/O, networking, or async runtime.  The
//! message-level domain (framing, filtering) lives in `vam-core` because the
//! keystroke consumer shares it.

pub mod config;

pub use config::{BridgeConfig, BridgeMqttConfig, ListenerConfig, DEFAULT_TOPIC};
