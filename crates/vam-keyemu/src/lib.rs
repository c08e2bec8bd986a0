//! vam-keyemu library crate.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! The consumer subscribes to an MQTT topic and treats every payload as a
//! key chord: `[17, 18, 72]` presses Ctrl, Alt and H in that order and
//! releases them in reverse.
//!
//! ```text
//! MQTT broker ──► mqtt_subscriber ──► EmulateKeysUseCase ──► KeyboardEmulator
//!                                       (parse, validate)      (SendInput / dry run)
//! ```
//!
//! Payloads are parsed with a strict numeric grammar (see
//! [`vam_core::KeySequence`]); anything else is logged and dropped.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: payload handling and the emulator seam.
pub mod application;

/// Infrastructure layer: OS keyboard adapters and the MQTT subscriber.
pub mod infrastructure;
