//! Message framing: turning a TCP byte stream into discrete text messages.
//!
//! TCP is a *stream* protocol: a single `read()` may return part of a message
//! or several messages at once.  Something has to decide where one
//! application message ends and the next begins.  That decision is the
//! framing policy, selected per listener in the config.
//!
//! # Policies
//!
//! | Mode      | Message boundary                          | Notes                                  |
//! |-----------|-------------------------------------------|----------------------------------------|
//! | `chunk`   | whatever one bounded read returns         | default; what existing senders expect  |
//! | `newline` | `\n` (a preceding `\r` is stripped)       | long lines are discarded and reported  |
//!
//! The `chunk` mode matches what existing senders expect: a
//! logical message larger than the read size is split in two, and two
//! messages that arrive in one read are forwarded as one.  Senders that write
//! one short message at a time never notice.  Senders that can terminate
//! their messages with a newline should switch to `newline`.
//!
//! # Pipeline
//!
//! ```text
//! bytes ──► FrameDecoder::decode ──► Vec<u8> frame ──► decode_text ──► FramedMessage
//! ```
//!
//! The decoders are pure: they operate on a caller-owned accumulation buffer
//! and never touch a socket, so every edge case is unit-testable.

pub mod decoder;
pub mod text;

use serde::{Deserialize, Serialize};

pub use decoder::{ChunkDecoder, FrameDecoder, FrameError, LineDecoder};
pub use text::{decode_text, FramedMessage, MessageError};

/// Read size used by the `chunk` policy when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Longest accepted line for the `newline` policy when none is configured.
pub const DEFAULT_MAX_FRAME_LEN: usize = 4096;

/// Which framing strategy a connection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// One bounded read is one message.
    #[default]
    Chunk,
    /// Messages are terminated by `\n`.
    Newline,
}

impl std::str::FromStr for FramingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chunk" => Ok(Self::Chunk),
            "newline" => Ok(Self::Newline),
            other => Err(format!(
                "unknown framing mode '{other}' (expected 'chunk' or 'newline')"
            )),
        }
    }
}

impl std::fmt::Display for FramingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chunk => f.write_str("chunk"),
            Self::Newline => f.write_str("newline"),
        }
    }
}

/// Framing configuration for every connection accepted by the listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramingPolicy {
    /// Selected strategy.
    #[serde(default)]
    pub mode: FramingMode,
    /// Bytes per read in `chunk` mode (and the read buffer size in general).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Maximum line length in `newline` mode, excluding the terminator.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

impl Default for FramingPolicy {
    fn default() -> Self {
        Self {
            mode: FramingMode::default(),
            chunk_size: default_chunk_size(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl FramingPolicy {
    /// Builds a fresh decoder for one connection.
    ///
    /// Decoders carry per-connection state, so every connection gets its own.
    pub fn decoder(&self) -> Box<dyn FrameDecoder> {
        match self.mode {
            FramingMode::Chunk => Box::new(ChunkDecoder::new(self.chunk_size)),
            FramingMode::Newline => Box::new(LineDecoder::new(self.chunk_size, self.max_frame_len)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_chunk_of_256_bytes() {
        let policy = FramingPolicy::default();
        assert_eq!(policy.mode, FramingMode::Chunk);
        assert_eq!(policy.chunk_size, 256);
    }

    #[test]
    fn test_framing_mode_parses_case_insensitively() {
        assert_eq!("Newline".parse::<FramingMode>(), Ok(FramingMode::Newline));
        assert_eq!("CHUNK".parse::<FramingMode>(), Ok(FramingMode::Chunk));
    }

    #[test]
    fn test_framing_mode_rejects_unknown_names() {
        let err = "length-prefixed".parse::<FramingMode>().unwrap_err();
        assert!(err.contains("length-prefixed"));
    }

    #[test]
    fn test_decoder_read_size_follows_chunk_size() {
        let policy = FramingPolicy {
            mode: FramingMode::Newline,
            chunk_size: 64,
            max_frame_len: 128,
        };
        assert_eq!(policy.decoder().read_size(), 64);
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: FramingPolicy = toml::from_str("mode = \"newline\"").expect("deserialize");
        assert_eq!(policy.mode, FramingMode::Newline);
        assert_eq!(policy.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(policy.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }
}
