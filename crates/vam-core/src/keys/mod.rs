//! Key codes and key sequences carried in consumer payloads.
//!
//! Payloads are a textual array of Windows virtual-key codes, for example
//! `[17, 18, 72]` for Ctrl+Alt+H.  They are parsed with a small strict
//! grammar; nothing in a payload is ever evaluated.

pub mod sequence;
pub mod virtual_key;

pub use sequence::{KeySequence, KeySequenceError, MAX_KEYS};
pub use virtual_key::VirtualKey;
