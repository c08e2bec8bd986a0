//! # vam-core
//!
//! Shared library for the VAM bridge and its keystroke consumer.  It holds
//! everything that can be expressed without sockets, timers, or an async
//! runtime, so both binaries (and their tests) can use it directly.
//!
//! # Architecture overview
//!
//! The bridge receives raw TCP bytes from an external application, cuts them
//! into messages, keeps only the ones that match a fixed pattern, and
//! republishes them on an MQTT topic.  A companion consumer subscribes to a
//! topic and turns payloads such as `[17, 18, 72]` into key presses.
//!
//! This crate defines the pure pieces of that pipeline:
//!
//! - **`framing`** – How a byte stream becomes discrete messages.  Framing is
//!   a swappable strategy: the `chunk` decoder treats each read as one message
//!   (the behaviour existing senders rely on), the `newline` decoder splits on
//!   `\n`.  Frames are then decoded as UTF-8 and trimmed.
//!
//! - **`filter`** – The forwarding rule: `generic` followed by three digits,
//!   anchored at the start of the message.
//!
//! - **`keys`** – Strict parsing of consumer payloads into a bounded
//!   [`KeySequence`] of Windows virtual-key codes.
//!
//! - **`reconnect`** – Bounded exponential backoff used by both MQTT loops.
//!
//! - **`config`** – TOML-backed broker settings shared by both binaries.

pub mod config;
pub mod filter;
pub mod framing;
pub mod keys;
pub mod reconnect;

// Re-export the most-used types at the crate root so callers can write
// `vam_core::PatternFilter` instead of `vam_core::filter::PatternFilter`.
pub use config::{ConfigError, MqttSettings, QosLevel};
pub use filter::PatternFilter;
pub use framing::{
    decode_text, FrameDecoder, FrameError, FramedMessage, FramingMode, FramingPolicy,
    MessageError,
};
pub use keys::{KeySequence, KeySequenceError, VirtualKey, MAX_KEYS};
pub use reconnect::{Backoff, ReconnectPolicy};
