//! Infrastructure layer for the keystroke consumer.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `vam_core`, but MUST NOT be imported by them.
//!
//! # Sub-modules
//!
//! - **`input_emulation`** – Implementations of `KeyboardEmulator`: `SendInput`
//!   on Windows, a dry-run emulator that only logs, and a recording emulator
//!   for tests.
//!
//! - **`mqtt_subscriber`** – Broker connection that subscribes to the input
//!   topic after every (re)connect and hands each payload to the use case.

pub mod input_emulation;
pub mod mqtt_subscriber;

pub use mqtt_subscriber::{MqttSubscriber, SubscriberStats};
