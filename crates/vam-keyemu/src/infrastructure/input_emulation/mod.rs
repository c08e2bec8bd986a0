//! Keyboard emulation backends.
//!
//! The OS implementation is selected at compile time via
//! `#[cfg(target_os = ...)]`.  Virtual-key codes are a Windows concept, so
//! only Windows injects real input; every other platform runs the
//! [`DryRunEmulator`], which logs what it would have typed.

use std::sync::Arc;

use crate::application::KeyboardEmulator;

pub mod dry_run;
pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

pub use dry_run::DryRunEmulator;
pub use mock::{KeyEvent, RecordingEmulator};

/// `true` when this build can inject real key presses.
pub const NATIVE_INPUT_AVAILABLE: bool = cfg!(target_os = "windows");

/// Picks the emulator for this platform.
///
/// `dry_run` forces the logging emulator even where real injection exists.
pub fn platform_emulator(dry_run: bool) -> Arc<dyn KeyboardEmulator> {
    if dry_run || !NATIVE_INPUT_AVAILABLE {
        return Arc::new(DryRunEmulator::new());
    }
    native_emulator()
}

#[cfg(target_os = "windows")]
fn native_emulator() -> Arc<dyn KeyboardEmulator> {
    Arc::new(windows::WindowsKeyboardEmulator::new())
}

#[cfg(not(target_os = "windows"))]
fn native_emulator() -> Arc<dyn KeyboardEmulator> {
    Arc::new(DryRunEmulator::new())
}
