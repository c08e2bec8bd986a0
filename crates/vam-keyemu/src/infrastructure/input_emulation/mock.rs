//! Recording keyboard emulator for tests.
//!
//! The real emulator calls `SendInput`, which needs an interactive desktop
//! and actually types on the test machine.  [`RecordingEmulator`] replaces
//! the OS call with an in-memory log so tests can assert exactly which keys
//! went down and up, and in what order.
//!
//! ```ignore
//! let emulator = Arc::new(RecordingEmulator::new());
//! let use_case = EmulateKeysUseCase::new(emulator.clone());
//!
//! use_case.handle_payload(b"[17, 72]").unwrap();
//!
//! assert_eq!(emulator.events(), vec![
//!     KeyEvent::Down(VirtualKey::CONTROL), KeyEvent::Down(h),
//!     KeyEvent::Up(h), KeyEvent::Up(VirtualKey::CONTROL),
//! ]);
//! ```

use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;
use vam_core::VirtualKey;

use crate::application::{EmulationError, KeyboardEmulator};

/// One recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(VirtualKey),
    Up(VirtualKey),
}

/// Records every press and release without touching the OS.
#[derive(Debug, Default)]
pub struct RecordingEmulator {
    events: Mutex<Vec<KeyEvent>>,
    /// Pressing this key fails with `EmulationError::Platform`.
    fail_on: Option<VirtualKey>,
    changed: Notify,
}

impl RecordingEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An emulator whose `press` fails for `key`.
    pub fn failing_on(key: VirtualKey) -> Self {
        Self {
            fail_on: Some(key),
            ..Self::default()
        }
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<KeyEvent> {
        self.lock().clone()
    }

    /// Waits until at least `count` events are recorded.
    ///
    /// Returns the events, or `None` on timeout.
    pub async fn wait_for_events(
        &self,
        count: usize,
        timeout: std::time::Duration,
    ) -> Option<Vec<KeyEvent>> {
        let wait = async {
            loop {
                let notified = self.changed.notified();
                {
                    let events = self.lock();
                    if events.len() >= count {
                        return events.clone();
                    }
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.ok()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<KeyEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, event: KeyEvent) {
        self.lock().push(event);
        self.changed.notify_waiters();
    }
}

impl KeyboardEmulator for RecordingEmulator {
    fn press(&self, key: VirtualKey) -> Result<(), EmulationError> {
        if self.fail_on == Some(key) {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.record(KeyEvent::Down(key));
        Ok(())
    }

    fn release(&self, key: VirtualKey) -> Result<(), EmulationError> {
        self.record(KeyEvent::Up(key));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::EmulateKeysUseCase;

    fn key(code: u8) -> VirtualKey {
        VirtualKey::new(code).unwrap()
    }

    #[test]
    fn test_records_chord_in_press_then_reverse_release_order() {
        // Arrange
        let emulator = Arc::new(RecordingEmulator::new());
        let use_case = EmulateKeysUseCase::new(emulator.clone());

        // Act
        use_case.handle_payload(b"[17, 18, 72]").unwrap();

        // Assert
        assert_eq!(
            emulator.events(),
            vec![
                KeyEvent::Down(key(17)),
                KeyEvent::Down(key(18)),
                KeyEvent::Down(key(72)),
                KeyEvent::Up(key(72)),
                KeyEvent::Up(key(18)),
                KeyEvent::Up(key(17)),
            ]
        );
    }

    #[test]
    fn test_failing_key_leaves_nothing_held() {
        let emulator = Arc::new(RecordingEmulator::failing_on(key(72)));
        let use_case = EmulateKeysUseCase::new(emulator.clone());

        assert!(use_case.handle_payload(b"[17, 72]").is_err());
        assert_eq!(
            emulator.events(),
            vec![KeyEvent::Down(key(17)), KeyEvent::Up(key(17))]
        );
    }

    #[test]
    fn test_single_key_payload() {
        let emulator = Arc::new(RecordingEmulator::new());
        let use_case = EmulateKeysUseCase::new(emulator.clone());

        use_case.handle_payload(b"[0x0D]").unwrap();

        assert_eq!(
            emulator.events(),
            vec![KeyEvent::Down(key(0x0D)), KeyEvent::Up(key(0x0D))]
        );
    }

    #[tokio::test]
    async fn test_wait_for_events_times_out_when_nothing_recorded() {
        let emulator = RecordingEmulator::new();
        let events = emulator
            .wait_for_events(1, std::time::Duration::from_millis(20))
            .await;
        assert!(events.is_none());
    }
}
