//! Windows virtual-key code newtype.

use std::fmt;

/// A Windows virtual-key (VK) code in the range `0x01..=0xFE`.
///
/// `0x00` and `0xFF` are not assigned to any key and are rejected on
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualKey(u8);

impl VirtualKey {
    pub const SHIFT: VirtualKey = VirtualKey(0x10);
    pub const CONTROL: VirtualKey = VirtualKey(0x11);
    pub const MENU: VirtualKey = VirtualKey(0x12);

    /// Lowest assigned code.
    pub const MIN: u8 = 0x01;
    /// Highest assigned code.
    pub const MAX: u8 = 0xFE;

    /// Returns `None` for codes outside `0x01..=0xFE`.
    pub fn new(code: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&code).then_some(Self(code))
    }

    /// Returns the raw code.
    pub fn code(self) -> u8 {
        self.0
    }

    /// Keys that `SendInput` must flag with `KEYEVENTF_EXTENDEDKEY`.
    pub fn is_extended(self) -> bool {
        matches!(
            self.0,
            0x21..=0x28     // PageUp, PageDown, End, Home, arrows
            | 0x2D | 0x2E   // Insert, Delete
            | 0x5B | 0x5C   // Left/Right Win
            | 0xA3 | 0xA5   // Right Ctrl, Right Alt
        )
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

impl TryFrom<u8> for VirtualKey {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::new(code).ok_or(code)
    }
}
