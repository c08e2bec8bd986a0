//! EmulateKeysUseCase: turns a bus payload into a key chord.
//!
//! A payload such as `[17, 18, 72]` is decoded as UTF-8, parsed strictly into
//! a [`KeySequence`] and replayed through a [`KeyboardEmulator`]: every key is
//! pressed in order, then released in reverse order, so `[17, 18, 72]` types
//! Ctrl+Alt+H.
//!
//! The platform-specific emulators are in the infrastructure layer.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use vam_core::{KeySequence, KeySequenceError, VirtualKey};

/// Error type for key injection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmulationError {
    #[error("platform error: {0}")]
    Platform(String),
    /// The OS accepted the call but injected nothing (blocked by UIPI, for
    /// example).
    #[error("key {0} was not injected")]
    NotInjected(VirtualKey),
}

/// Platform-agnostic keyboard emulation trait.
///
/// Each supported OS provides an implementation in the infrastructure layer.
#[cfg_attr(test, mockall::automock)]
pub trait KeyboardEmulator: Send + Sync {
    /// Emulates a key-down event.
    fn press(&self, key: VirtualKey) -> Result<(), EmulationError>;

    /// Emulates a key-up event.
    fn release(&self, key: VirtualKey) -> Result<(), EmulationError>;
}

/// Why a payload did not produce a keystroke.
///
/// None of these are fatal to the consumer; the payload is logged and
/// dropped.
#[derive(Debug, Error)]
pub enum KeystrokeError {
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid key sequence: {0}")]
    Parse(#[from] KeySequenceError),

    #[error("key emulation failed: {0}")]
    Emulation(#[from] EmulationError),
}

/// The Emulate Keys use case.
pub struct EmulateKeysUseCase {
    emulator: Arc<dyn KeyboardEmulator>,
}

impl EmulateKeysUseCase {
    pub fn new(emulator: Arc<dyn KeyboardEmulator>) -> Self {
        Self { emulator }
    }

    /// Decodes, parses and replays one payload.
    ///
    /// Returns the sequence that was typed.
    ///
    /// # Errors
    ///
    /// Returns [`KeystrokeError`] if the payload is not a valid key sequence
    /// or the emulator fails.  Nothing is pressed for an invalid payload.
    pub fn handle_payload(&self, payload: &[u8]) -> Result<KeySequence, KeystrokeError> {
        let text = std::str::from_utf8(payload)?;
        let sequence = KeySequence::parse(text)?;
        self.simulate(&sequence)?;
        Ok(sequence)
    }

    /// Presses every key in order, then releases them in reverse.
    ///
    /// If a press fails, the keys already held down are released (in
    /// reverse) before the error is returned, so no key is left stuck.  A
    /// failed release does not stop the remaining releases; the first
    /// release error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmulationError`] encountered.
    pub fn simulate(&self, sequence: &KeySequence) -> Result<(), EmulationError> {
        let mut pressed: Vec<VirtualKey> = Vec::with_capacity(sequence.len());

        for key in sequence.press_order() {
            if let Err(e) = self.emulator.press(key) {
                self.release_all(pressed.iter().rev().copied());
                return Err(e);
            }
            pressed.push(key);
        }

        match self.release_all(sequence.release_order()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Releases every key, returning the first failure.
    fn release_all(&self, keys: impl Iterator<Item = VirtualKey>) -> Option<EmulationError> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.emulator.release(key) {
                warn!("failed to release key {key}: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
