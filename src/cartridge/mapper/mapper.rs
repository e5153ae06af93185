//! Mapper trait: PRG/CHR memory access, mirroring, and scanline IRQ.

use crate::cartridge::mapper::Mirroring;

/// Trait for NES cartridge mappers. CPU/PPU use these for all cartridge address space.
///
/// Reads are pure functions of the current bank-select state. Writes change bank-select
/// state, PRG RAM, or CHR RAM; PRG ROM and CHR ROM contents never change.
pub trait Mapper {
    /// Read from PRG RAM ($6000–$7FFF) or PRG ROM ($8000–$FFFF).
    fn read_prg(&self, addr: u16) -> u8;
    /// Write to PRG RAM or mapper registers (PRG ROM is read-only).
    fn write(&mut self, addr: u16, data: u8);
    /// Read from CHR ROM/RAM ($0000–$1FFF).
    fn read_chr(&self, addr: u16) -> u8;
    /// Write to CHR RAM; ignored for CHR ROM.
    fn write_chr(&mut self, addr: u16, data: u8);
    /// Current nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;

    /// Called once per rendering scanline by the PPU. No-op for boards without IRQ hardware.
    fn scanline_irq(&mut self, _scanline: u16, _rendering_enabled: bool) {}

    /// Read-and-clear the pending IRQ.
    fn poll_irq(&mut self) -> bool {
        false
    }

    /// Level of the cartridge IRQ line. Stays asserted until the board's own acknowledge.
    fn irq_line(&self) -> bool {
        false
    }

    /// PRG RAM contents, for boards that carry RAM.
    fn prg_ram(&self) -> Option<&[u8]> {
        None
    }

    /// True once after any PRG RAM byte changed.
    fn take_ram_dirty(&mut self) -> bool {
        false
    }
}
