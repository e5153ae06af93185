//! 6502 processor status register (P) flag bits.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        const CARRY = 1 << 0;
        const ZERO = 1 << 1;
        const INTERRUPT_DISABLE = 1 << 2;
        const DECIMAL = 1 << 3;  // 2A03 has no BCD; flag is stored but ignored
        const BREAK = 1 << 4;    // Only exists in the pushed copy (BRK / PHP)
        const UNUSED = 1 << 5;   // Always 1 when pushed
        const OVERFLOW = 1 << 6;
        const NEGATIVE = 1 << 7;
    }
}

impl Status {
    /// Power-on / reset value: interrupts disabled, reserved bit set.
    pub const POWER_ON: Status = Status::INTERRUPT_DISABLE.union(Status::UNUSED);

    /// Byte pushed by PHP and BRK: B and U set.
    pub fn pushed_by_instruction(self) -> u8 {
        (self | Status::BREAK | Status::UNUSED).bits()
    }

    /// Byte pushed by NMI and IRQ: B clear, U set.
    pub fn pushed_by_interrupt(self) -> u8 {
        ((self - Status::BREAK) | Status::UNUSED).bits()
    }

    /// Status restored by PLP and RTI: B is discarded, U forced.
    pub fn pulled(byte: u8) -> Status {
        (Status::from_bits_retain(byte) - Status::BREAK) | Status::UNUSED
    }
}
