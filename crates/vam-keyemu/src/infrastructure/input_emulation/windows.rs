//! Windows keyboard emulation via the SendInput API.
//!
//! Payload codes are already Windows virtual-key codes, so they are passed
//! to `SendInput` as `wVk` unchanged.  Navigation keys and the right-hand
//! modifiers carry `KEYEVENTF_EXTENDEDKEY`.

#![cfg(target_os = "windows")]

use vam_core::VirtualKey;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VIRTUAL_KEY,
};

use crate::application::{EmulationError, KeyboardEmulator};

/// Windows implementation of [`KeyboardEmulator`] using SendInput.
pub struct WindowsKeyboardEmulator;

impl WindowsKeyboardEmulator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsKeyboardEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardEmulator for WindowsKeyboardEmulator {
    fn press(&self, key: VirtualKey) -> Result<(), EmulationError> {
        send_key(key, false)
    }

    fn release(&self, key: VirtualKey) -> Result<(), EmulationError> {
        send_key(key, true)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn key_flags(key: VirtualKey, key_up: bool) -> KEYBD_EVENT_FLAGS {
    let mut flags = KEYBD_EVENT_FLAGS(0);
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }
    if key.is_extended() {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    flags
}

fn send_key(key: VirtualKey, key_up: bool) -> Result<(), EmulationError> {
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(u16::from(key.code())),
                wScan: 0,
                dwFlags: key_flags(key, key_up),
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    // SAFETY: input is a valid KEYBDINPUT structure on the stack
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        return Err(EmulationError::NotInjected(key));
    }
    Ok(())
}
