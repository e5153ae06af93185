//! Mapper 2 (UxROM): 16 KiB switchable bank at $8000, last bank fixed at $C000, 8 KiB CHR RAM.

use log::trace;

use crate::cartridge::mapper::{Mirroring, bank_base, mapper::Mapper};

pub struct Mapper2 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
    bank: u8,
}

impl Mapper2 {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr,
            chr_is_ram,
            mirroring,
            bank: 0,
        }
    }
}

impl Mapper for Mapper2 {
    fn read_prg(&self, addr: u16) -> u8 {
        let len = self.prg_rom.len();
        match addr {
            0x8000..=0xBFFF => {
                self.prg_rom[bank_base(self.bank as usize, 0x4000, len) + (addr as usize - 0x8000)]
            }
            0xC000..=0xFFFF => self.prg_rom[len - 0x4000 + (addr as usize - 0xC000)],
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.bank = data;
            trace!("UxROM bank {:02X}", data);
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr[addr as usize & 0x1FFF]
    }

    fn write_chr(&mut self, addr: u16, data: u8) {
        if self.chr_is_ram {
            self.chr[addr as usize & 0x1FFF] = data;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
