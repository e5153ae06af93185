//! 6502 CPU emulation for the NES.
//!
//! Documented instruction set, table-driven decode, NMI/IRQ/BRK.
//! Bus trait used for memory and I/O (PPU, APU, cartridge, controller).

pub mod cpu;
pub mod flags;
pub mod instruction;

#[cfg(test)]
mod tests;
