//! NES mappers for PRG/CHR memory mapping.
//!
//! Each board is a flat struct implementing [`Mapper`]; [`Board`] is the tagged union the
//! cartridge holds, so dispatch is a `match` rather than a vtable.

pub mod mapper;

pub mod mapper0;
pub mod mapper1;
pub mod mapper2;
pub mod mapper3;
pub mod mapper4;

use mapper::Mapper;
use mapper0::Mapper0;
use mapper1::Mapper1;
use mapper2::Mapper2;
use mapper3::Mapper3;
use mapper4::Mapper4;

/// Nametable mirroring mode for PPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
    OneScreenLower,
    OneScreenUpper,
}

/// Size of the battery-backable PRG RAM window at $6000–$7FFF.
pub const PRG_RAM_SIZE: usize = 8 * 1024;

/// Offset of `bank` within a ROM of `len` bytes split into `bank_size` banks.
/// Out-of-range selects wrap, as on boards that leave the upper select lines unconnected.
pub(crate) fn bank_base(bank: usize, bank_size: usize, len: usize) -> usize {
    let count = (len / bank_size).max(1);
    (bank % count) * bank_size
}

/// PRG RAM at $6000–$7FFF with a dirty bit for battery persistence.
pub struct PrgRam {
    data: Vec<u8>,
    dirty: bool,
}

impl PrgRam {
    /// 8 KiB of RAM, seeded from a save image when one exists. Short images are zero-padded.
    pub fn new(save: Option<&[u8]>) -> Self {
        let mut data = vec![0; PRG_RAM_SIZE];
        if let Some(save) = save {
            let n = save.len().min(PRG_RAM_SIZE);
            data[..n].copy_from_slice(&save[..n]);
        }
        Self { data, dirty: false }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.data[(addr as usize - 0x6000) % PRG_RAM_SIZE]
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        let i = (addr as usize - 0x6000) % PRG_RAM_SIZE;
        if self.data[i] != data {
            self.data[i] = data;
            self.dirty = true;
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// Human-readable board name for the iNES mapper number.
pub fn mapper_name(id: u8) -> &'static str {
    match id {
        0 => "NROM",
        1 => "MMC1",
        2 => "UxROM",
        3 => "CNROM",
        4 => "MMC3",
        _ => "unknown",
    }
}

/// The mapper variants this core supports.
pub enum Board {
    Nrom(Mapper0),
    Mmc1(Mapper1),
    Uxrom(Mapper2),
    Cnrom(Mapper3),
    Mmc3(Mapper4),
}

impl Board {
    pub fn as_mapper(&self) -> &dyn Mapper {
        match self {
            Board::Nrom(m) => m,
            Board::Mmc1(m) => m,
            Board::Uxrom(m) => m,
            Board::Cnrom(m) => m,
            Board::Mmc3(m) => m,
        }
    }

    pub fn as_mapper_mut(&mut self) -> &mut dyn Mapper {
        match self {
            Board::Nrom(m) => m,
            Board::Mmc1(m) => m,
            Board::Uxrom(m) => m,
            Board::Cnrom(m) => m,
            Board::Mmc3(m) => m,
        }
    }
}
