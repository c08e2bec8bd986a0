//! The forwarding rule applied to every framed message.
//!
//! A message is forwarded when it starts with the literal prefix `generic`
//! followed by exactly three ASCII digits.  Anything may follow the digits:
//!
//! | Message              | Forwarded | Why                          |
//! |----------------------|-----------|------------------------------|
//! | `generic042-start`   | yes       | prefix + 3 digits + suffix   |
//! | `generic007ready`    | yes       |                              |
//! | `generic42`          | no        | only two digits              |
//! | `xgeneric123`        | no        | not anchored at the start    |
//! | `Generic123`         | no        | case-sensitive               |
//!
//! The pattern is a constant; it is not configurable at runtime.

use std::sync::LazyLock;

use regex::Regex;

/// Literal prefix every forwarded message starts with.
pub const PREFIX: &str = "generic";

/// Anchored pattern.  `[0-9]` rather than `\d` so that non-ASCII digits
/// (which `regex` treats as `\d` in Unicode mode) are not accepted.
static FORWARD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^generic[0-9]{3}").unwrap());

/// Decides whether a framed message qualifies for forwarding.
///
/// Cheap to clone; the compiled regex is shared internally.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    regex: Regex,
}

impl PatternFilter {
    /// Returns a filter sharing the process-wide compiled pattern.
    pub fn new() -> Self {
        Self {
            regex: FORWARD_PATTERN.clone(),
        }
    }

    /// Returns `true` when `message` should be forwarded.
    pub fn matches(&self, message: &str) -> bool {
        self.regex.is_match(message)
    }
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
