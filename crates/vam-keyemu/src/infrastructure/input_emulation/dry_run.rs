//! Emulator that logs key events instead of injecting them.

use tracing::info;
use vam_core::VirtualKey;

use crate::application::{EmulationError, KeyboardEmulator};

/// Logs every press and release at `info`.  Never fails.
#[derive(Debug, Default)]
pub struct DryRunEmulator;

impl DryRunEmulator {
    pub fn new() -> Self {
        Self
    }
}

impl KeyboardEmulator for DryRunEmulator {
    fn press(&self, key: VirtualKey) -> Result<(), EmulationError> {
        info!(key = %key, "dry run: key down");
        Ok(())
    }

    fn release(&self, key: VirtualKey) -> Result<(), EmulationError> {
        info!(key = %key, "dry run: key up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_never_fails() {
        let emulator = DryRunEmulator::new();
        assert!(emulator.press(VirtualKey::SHIFT).is_ok());
        assert!(emulator.release(VirtualKey::SHIFT).is_ok());
    }
}
