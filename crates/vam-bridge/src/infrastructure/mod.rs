//! Infrastructure layer for vam-bridge.
//!
//! Everything that touches a socket: the TCP listener and its per-connection
//! handlers, the stream framer, and the MQTT client behind
//! [`BusPublisher`](crate::application::BusPublisher).

pub mod connection;
pub mod framer;
pub mod mqtt_publisher;
pub mod tcp_server;

pub use connection::{handle_connection, ConnectionEnd, ConnectionSummary};
pub use framer::{MessageFramer, NextMessage};
pub use mqtt_publisher::MqttPublisher;
pub use tcp_server::{Listener, NetworkError};
