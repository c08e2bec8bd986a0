//! Text decoding of raw frames.

use thiserror::Error;

use super::decoder::FrameError;

/// Why a frame could not become a [`FramedMessage`].
///
/// Both variants are per-message failures: the connection that produced the
/// frame carries on with the next one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The frame is not valid UTF-8.
    #[error("frame is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    /// The decoder discarded the frame.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// An immutable, trimmed text message cut from one connection's stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramedMessage(String);

impl FramedMessage {
    /// Borrows the message text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrows the message as bytes, ready for publishing.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns `true` when nothing but whitespace was received.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FramedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decodes a frame as UTF-8 and trims surrounding whitespace.
///
/// # Errors
///
/// Returns [`MessageError::InvalidUtf8`] for malformed input.  In `chunk`
/// framing this also happens when a multi-byte character straddles two
/// reads; the message is dropped rather than repaired.
pub fn decode_text(frame: &[u8]) -> Result<FramedMessage, MessageError> {
    let text = std::str::from_utf8(frame).map_err(|e| MessageError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;
    Ok(FramedMessage(text.trim().to_owned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
