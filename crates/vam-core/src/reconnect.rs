//! Bounded exponential backoff for broker reconnects.
//!
//! Both the bridge publisher and the keystroke consumer run a background MQTT
//! event loop.  When the broker goes away the loop keeps polling; between
//! failed attempts it sleeps for [`Backoff::next_delay`], which doubles from
//! `initial_delay_ms` up to `max_delay_ms`.  A successful CONNACK resets it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnect timing, usually the `[mqtt.reconnect]` table of a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// First delay after a failure, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for the delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Stateful delay generator built from a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: &ReconnectPolicy) -> Self {
        let initial = Duration::from_millis(policy.initial_delay_ms.max(1));
        let max = Duration::from_millis(policy.max_delay_ms).max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay to wait now and doubles the next one, capped at the
    /// policy maximum.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Starts over from the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial: u64, max: u64) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay_ms: initial,
            max_delay_ms: max,
        }
    }

    #[test]
    fn test_next_delay_doubles_until_capped() {
        let mut backoff = Backoff::new(&policy(100, 500));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn test_reset_returns_to_initial_delay() {
        let mut backoff = Backoff::new(&policy(50, 1_000));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_max_below_initial_is_raised_to_initial() {
        let mut backoff = Backoff::new(&policy(300, 100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(300));
        assert_eq!(backoff.next_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_zero_initial_delay_is_clamped() {
        let mut backoff = Backoff::new(&policy(0, 0));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_default_policy_values() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.initial_delay_ms, 500);
        assert_eq!(p.max_delay_ms, 30_000);
    }
}
