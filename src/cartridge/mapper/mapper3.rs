//! Mapper 3 (CNROM): fixed 16/32 KiB PRG, 8 KiB CHR bank selected by any write to $8000–$FFFF.

use log::trace;

use crate::cartridge::mapper::{Mirroring, bank_base, mapper::Mapper};

pub struct Mapper3 {
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mirroring: Mirroring,
    chr_bank: u8,
}

impl Mapper3 {
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr_rom,
            mirroring,
            chr_bank: 0,
        }
    }
}

impl Mapper for Mapper3 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => self.prg_rom[(addr as usize - 0x8000) % self.prg_rom.len()],
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.chr_bank = data;
            trace!("CNROM CHR bank {:02X}", data);
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        let base = bank_base(self.chr_bank as usize, 0x2000, self.chr_rom.len());
        self.chr_rom[base + (addr as usize & 0x1FFF)]
    }

    fn write_chr(&mut self, _addr: u16, _data: u8) {}

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
