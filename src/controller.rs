//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! write $01 to $4016 to latch current state; then read $4016 (pad 1) or $4017 (pad 2)
//! repeatedly to get one bit per read (A, B, Select, Start, Up, Down, Left, Right).

use bitflags::bitflags;

bitflags! {
    /// Button bits in shift-out order: bit 0 = A ... bit 7 = Right.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
        const LEFT = 1 << 6;
        const RIGHT = 1 << 7;
    }
}

/// Upper bits of a controller read come from the data bus (last opcode byte, usually $40).
const OPEN_BUS_BITS: u8 = 0x40;

/// Represents a single NES controller port.
#[derive(Default)]
pub struct Controller {
    /// Current button states, set by the frontend.
    pub buttons: Buttons,
    /// Latched copy of `buttons`, taken while strobe is high.
    latched: u8,
    /// Next bit to shift out; 8 and beyond means the register is empty.
    index: u8,
    strobe: bool,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one button state. Each read advances to the next button; once all eight have
    /// been shifted out every read returns 1. While strobe is high, always returns A.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            self.latched = self.buttons.bits();
            return (self.latched & 1) | OPEN_BUS_BITS;
        }
        let bit = if self.index < 8 {
            (self.latched >> self.index) & 1
        } else {
            1
        };
        self.index = self.index.saturating_add(1);
        bit | OPEN_BUS_BITS
    }

    /// Write to $4016. Bit 0 high latches the current buttons and rewinds the read pointer.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        if self.strobe {
            self.latched = self.buttons.bits();
            self.index = 0;
        }
    }
}
