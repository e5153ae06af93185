//! Mapper 1 (MMC1): bank switching via 5-bit shift register.
//!
//! [MMC1](https://www.nesdev.org/wiki/MMC1): writes to $8000–$9FFF (control), $A000–$BFFF (CHR0),
//! $C000–$DFFF (CHR1), $E000–$FFFF (PRG bank). Any write with bit 7 set resets the shift register.
//! Otherwise, bit 0 is shifted in (LSB first); after 5 writes, the value is latched to the selected
//! register. Control (bits 0–1) = mirroring; bits 2–3 = PRG mode; bit 4 = CHR mode.

use log::debug;

use crate::cartridge::mapper::{Mirroring, PrgRam, bank_base, mapper::Mapper};

/// MMC1 state: 5-bit shift register, control byte (mirroring + PRG/CHR mode), bank selects.
pub struct Mapper1 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: PrgRam,
    shift_reg: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl Mapper1 {
    /// Create MMC1. Control defaults to $0C (PRG mode 3: $8000 switchable, $C000 fixed last).
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool, save: Option<&[u8]>) -> Self {
        Self {
            prg_rom,
            chr,
            chr_is_ram,
            prg_ram: PrgRam::new(save),
            shift_reg: 0,
            shift_count: 0,
            control: 0x0C,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    /// PRG bank mode from control bits 2–3: 0/1 = 32 KiB mode; 2 = $8000 fixed first, $C000 switchable; 3 = $8000 switchable, $C000 fixed last.
    fn prg_bank_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    /// CHR mode from control bit 4: 0 = one 8 KiB bank, 1 = two 4 KiB banks.
    fn chr_4k_mode(&self) -> bool {
        self.control & 0x10 != 0
    }

    /// Bit 4 of the PRG register disables PRG RAM.
    fn ram_enabled(&self) -> bool {
        self.prg_bank & 0x10 == 0
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let len = self.prg_rom.len();
        let bank = (self.prg_bank & 0x0F) as usize;
        let addr = addr as usize;
        match self.prg_bank_mode() {
            0 | 1 => bank_base(bank >> 1, 0x8000, len) + (addr - 0x8000),
            2 => {
                if addr < 0xC000 {
                    addr - 0x8000
                } else {
                    bank_base(bank, 0x4000, len) + (addr - 0xC000)
                }
            }
            _ => {
                if addr < 0xC000 {
                    bank_base(bank, 0x4000, len) + (addr - 0x8000)
                } else {
                    len - 0x4000 + (addr - 0xC000)
                }
            }
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let len = self.chr.len();
        let addr = addr as usize & 0x1FFF;
        if self.chr_4k_mode() {
            let bank = if addr < 0x1000 {
                self.chr_bank0
            } else {
                self.chr_bank1
            };
            bank_base(bank as usize, 0x1000, len) + (addr & 0x0FFF)
        } else {
            bank_base((self.chr_bank0 >> 1) as usize, 0x2000, len) + addr
        }
    }

    fn commit(&mut self, addr: u16, value: u8) {
        match addr {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank0 = value,
            0xC000..=0xDFFF => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
        debug!(
            "MMC1 commit ${:04X} <- {:05b} (control={:05b} chr0={:02X} chr1={:02X} prg={:02X})",
            addr, value, self.control, self.chr_bank0, self.chr_bank1, self.prg_bank
        );
    }
}

impl Mapper for Mapper1 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF if self.ram_enabled() => self.prg_ram.read(addr),
            0x8000..=0xFFFF => self.prg_rom[self.prg_offset(addr)],
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.ram_enabled() {
                    self.prg_ram.write(addr, data);
                }
            }
            0x8000..=0xFFFF => {
                // Write with bit 7 set resets the shift register and forces PRG mode 3.
                if data & 0x80 != 0 {
                    self.shift_reg = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }

                self.shift_reg >>= 1;
                self.shift_reg |= (data & 1) << 4;
                self.shift_count += 1;

                if self.shift_count == 5 {
                    let value = self.shift_reg & 0x1F;
                    self.commit(addr, value);
                    self.shift_reg = 0;
                    self.shift_count = 0;
                }
            }
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr[self.chr_offset(addr)]
    }

    fn write_chr(&mut self, addr: u16, data: u8) {
        if self.chr_is_ram {
            let i = self.chr_offset(addr);
            self.chr[i] = data;
        }
    }

    /// Mirroring from control bits 0–1: 0 = one-screen lower, 1 = one-screen upper, 2 = vertical, 3 = horizontal.
    fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::OneScreenLower,
            1 => Mirroring::OneScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn prg_ram(&self) -> Option<&[u8]> {
        Some(self.prg_ram.bytes())
    }

    fn take_ram_dirty(&mut self) -> bool {
        self.prg_ram.take_dirty()
    }
}
