//! Application layer use cases for the keystroke consumer.
//!
//! - **`emulate_keys`** – Decodes a bus payload into a [`vam_core::KeySequence`]
//!   and replays it as a key chord.  The actual OS call is made by a
//!   [`KeyboardEmulator`] implementation injected at construction time.

pub mod emulate_keys;

pub use emulate_keys::{EmulateKeysUseCase, EmulationError, KeyboardEmulator, KeystrokeError};
