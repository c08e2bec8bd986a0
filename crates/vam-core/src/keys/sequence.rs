//! Strict parser for key-sequence payloads.
//!
//! Grammar (whitespace allowed around every token):
//!
//! ```text
//! sequence := "[" code ( "," code ){0,3} "]"
//! code     := decimal | "0x" hex | "0X" hex
//! ```
//!
//! Every code must name an assigned virtual key (1–254).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::virtual_key::VirtualKey;

/// Most keys one payload may hold down at once.
pub const MAX_KEYS: usize = 4;

/// Why a payload is not a valid key sequence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeySequenceError {
    #[error("payload must be a bracketed list such as [17, 72]")]
    NotBracketed,

    #[error("key sequence is empty")]
    Empty,

    #[error("key sequence has {count} keys; at most {MAX_KEYS} are allowed")]
    TooManyKeys { count: usize },

    #[error("'{0}' is not a key code")]
    InvalidToken(String),

    #[error("key code {0} is outside 1..=254")]
    InvalidKeyCode(u32),
}

/// One to [`MAX_KEYS`] virtual keys, in press order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySequence {
    keys: Vec<VirtualKey>,
}

impl KeySequence {
    /// Builds a sequence from already-validated keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeySequenceError::Empty`] or [`KeySequenceError::TooManyKeys`]
    /// when the length is out of range.
    pub fn new(keys: Vec<VirtualKey>) -> Result<Self, KeySequenceError> {
        match keys.len() {
            0 => Err(KeySequenceError::Empty),
            n if n > MAX_KEYS => Err(KeySequenceError::TooManyKeys { count: n }),
            _ => Ok(Self { keys }),
        }
    }

    /// Parses a textual payload such as `[17, 18, 0x48]`.
    ///
    /// # Errors
    ///
    /// See [`KeySequenceError`].
    pub fn parse(payload: &str) -> Result<Self, KeySequenceError> {
        let inner = payload
            .trim()
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or(KeySequenceError::NotBracketed)?;

        if inner.trim().is_empty() {
            return Err(KeySequenceError::Empty);
        }

        let tokens: Vec<&str> = inner.split(',').map(str::trim).collect();
        if tokens.len() > MAX_KEYS {
            return Err(KeySequenceError::TooManyKeys {
                count: tokens.len(),
            });
        }

        let keys = tokens
            .into_iter()
            .map(parse_code)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(keys)
    }

    /// Keys in press order.
    pub fn press_order(&self) -> impl Iterator<Item = VirtualKey> + '_ {
        self.keys.iter().copied()
    }

    /// Keys in release order (the reverse of press order).
    pub fn release_order(&self) -> impl Iterator<Item = VirtualKey> + '_ {
        self.keys.iter().rev().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always `false`; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn as_slice(&self) -> &[VirtualKey] {
        &self.keys
    }
}

fn parse_code(token: &str) -> Result<VirtualKey, KeySequenceError> {
    let invalid = || KeySequenceError::InvalidToken(token.to_owned());

    let value = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u32::from_str_radix(hex, 16).map_err(|_| invalid())?
        }
        Some(_) => return Err(invalid()),
        None if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) => {
            token.parse::<u32>().map_err(|_| invalid())?
        }
        None => return Err(invalid()),
    };

    u8::try_from(value)
        .ok()
        .and_then(VirtualKey::new)
        .ok_or(KeySequenceError::InvalidKeyCode(value))
}

impl FromStr for KeySequence {
    type Err = KeySequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", key.code())?;
        }
        f.write_str("]")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
