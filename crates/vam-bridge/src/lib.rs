//! vam-bridge library crate.
//!
//! Accepts TCP connections from an external application, cuts each
//! connection's byte stream into messages, and republishes the ones that
//! match `generic` + three digits on an MQTT topic.
//!
//! # Architecture
//!
//! ```text
//! external app (raw TCP, port 39340)
//!         │  one task per connection
//!         ▼
//! [vam-bridge]
//!   ├── domain/          BridgeConfig (TOML schema, defaults, validation)
//!   ├── application/     Forwarder (filter + publish + counters), BusPublisher seam
//!   └── infrastructure/
//!         ├── tcp_server/      Listener: bind, accept loop, graceful drain
//!         ├── connection/      per-connection framer → forwarder loop
//!         ├── framer/          byte stream → FramedMessage
//!         └── mqtt_publisher/  single shared broker connection (rumqttc)
//!         │
//!         ▼
//! MQTT broker, topic /namespace/vam
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `vam-core`; the bus is a trait.
//! - `infrastructure` depends on all other layers plus `tokio` and `rumqttc`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: forwarding logic and the publisher seam.
pub mod application;

/// Infrastructure layer: TCP listener, framing, MQTT client.
pub mod infrastructure;
