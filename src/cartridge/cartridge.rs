//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mapper, etc.), then an optional
//! 512-byte trainer, then PRG ROM, then CHR ROM. CHR may be ROM or RAM depending on the header.
//! [Mapper](https://www.nesdev.org/wiki/Mapper) implements CPU PRG ($6000–$FFFF) and PPU CHR
//! ($0000–$1FFF) address decoding and bank switching.
//!
//! Battery-backed PRG RAM is persisted as a flat dump next to the ROM (`game.nes` → `game.sav`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::cartridge::mapper::mapper0::Mapper0;
use crate::cartridge::mapper::mapper1::Mapper1;
use crate::cartridge::mapper::mapper2::Mapper2;
use crate::cartridge::mapper::mapper3::Mapper3;
use crate::cartridge::mapper::mapper4::Mapper4;
use crate::cartridge::mapper::{Board, Mirroring, mapper_name};

pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_BANK_SIZE: usize = 16 * 1024;
pub const CHR_BANK_SIZE: usize = 8 * 1024;

const MAGIC: [u8; 4] = *b"NES\x1A";

/// Fatal cartridge load errors. Nothing is constructed when one of these is returned.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("file is shorter than the 16-byte iNES header ({0} bytes)")]
    TooShort(usize),
    #[error("missing iNES magic, found {0:02X?}")]
    BadMagic([u8; 4]),
    #[error("{section} truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
    #[error("invalid bank layout for mapper {mapper}: {reason}")]
    InvalidBankLayout { mapper: u8, reason: String },
    #[error("failed to read ROM: {0}")]
    Io(#[from] io::Error),
}

/// Decoded iNES header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub prg_banks: u8,
    pub chr_banks: u8,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
}

impl Header {
    /// Header bytes 4–5 = PRG/CHR size; bytes 6–7 = mapper number (low nibble of 6 | high nibble
    /// of 7) and board flags.
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_LEN {
            return Err(CartridgeError::TooShort(data.len()));
        }
        let magic = [data[0], data[1], data[2], data[3]];
        if magic != MAGIC {
            return Err(CartridgeError::BadMagic(magic));
        }
        let flags6 = data[6];
        let flags7 = data[7];

        // Bit 3 overrides the solder-pad bit 0: 0 = horizontal, 1 = vertical.
        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(Self {
            prg_banks: data[4],
            chr_banks: data[5],
            mapper: (flags6 >> 4) | (flags7 & 0xF0),
            mirroring,
            battery: flags6 & 0x02 != 0,
            trainer: flags6 & 0x04 != 0,
        })
    }

    pub fn prg_len(&self) -> usize {
        self.prg_banks as usize * PRG_BANK_SIZE
    }

    pub fn chr_len(&self) -> usize {
        self.chr_banks as usize * CHR_BANK_SIZE
    }
}

/// Cartridge: holds the board (mapper + PRG/CHR/RAM) and where to persist battery RAM.
/// CPU reads PRG via bus at $6000–$FFFF; PPU reads CHR at $0000–$1FFF (pattern tables).
pub struct Cartridge {
    pub header: Header,
    pub board: Board,
    save_path: Option<PathBuf>,
}

impl Cartridge {
    /// Load a cartridge from an iNES file, picking up `<rom>.sav` when the board has a battery.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let save_path = path.with_extension("sav");

        let header = Header::parse(&data)?;
        let save = if header.battery {
            match fs::read(&save_path) {
                Ok(bytes) => {
                    info!("loaded {} bytes of save RAM from {}", bytes.len(), save_path.display());
                    Some(bytes)
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => {
                    warn!("could not read {}: {}; starting with blank RAM", save_path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let mut cart = Self::from_bytes(&data, save.as_deref())?;
        if cart.header.battery {
            cart.save_path = Some(save_path);
        }
        Ok(cart)
    }

    /// Build a cartridge from a raw iNES image and an optional battery RAM image.
    pub fn from_bytes(data: &[u8], save: Option<&[u8]>) -> Result<Self, CartridgeError> {
        let header = Header::parse(data)?;

        let prg_start = HEADER_LEN + if header.trainer { TRAINER_LEN } else { 0 };
        let prg_end = prg_start + header.prg_len();
        let chr_end = prg_end + header.chr_len();

        if header.prg_banks == 0 {
            return Err(CartridgeError::InvalidBankLayout {
                mapper: header.mapper,
                reason: "no PRG ROM".into(),
            });
        }
        if data.len() < prg_end {
            return Err(CartridgeError::Truncated {
                section: "PRG ROM",
                expected: header.prg_len(),
                actual: data.len().saturating_sub(prg_start),
            });
        }
        if data.len() < chr_end {
            return Err(CartridgeError::Truncated {
                section: "CHR ROM",
                expected: header.chr_len(),
                actual: data.len() - prg_end,
            });
        }

        let prg_rom = data[prg_start..prg_end].to_vec();
        // No CHR ROM → 8 KiB CHR RAM.
        let chr_is_ram = header.chr_banks == 0;
        let chr = if chr_is_ram {
            vec![0; CHR_BANK_SIZE]
        } else {
            data[prg_end..chr_end].to_vec()
        };

        let board = build_board(&header, prg_rom, chr, chr_is_ram, save)?;

        info!(
            "cartridge: mapper {} ({}), PRG {} KiB, CHR {} KiB{}, {:?} mirroring{}",
            header.mapper,
            mapper_name(header.mapper),
            header.prg_len() / 1024,
            if chr_is_ram { 8 } else { header.chr_len() / 1024 },
            if chr_is_ram { " RAM" } else { "" },
            header.mirroring,
            if header.battery { ", battery" } else { "" },
        );

        Ok(Self {
            header,
            board,
            save_path: None,
        })
    }

    /// Read PRG RAM ($6000–$7FFF) or PRG ROM ($8000–$FFFF).
    pub fn read_prg(&self, addr: u16) -> u8 {
        self.board.as_mapper().read_prg(addr)
    }

    /// Write to PRG RAM or mapper registers. PRG ROM is R/O.
    pub fn write_prg(&mut self, addr: u16, data: u8) {
        self.board.as_mapper_mut().write(addr, data);
    }

    pub fn read_chr(&self, addr: u16) -> u8 {
        self.board.as_mapper().read_chr(addr)
    }

    pub fn write_chr(&mut self, addr: u16, data: u8) {
        self.board.as_mapper_mut().write_chr(addr, data);
    }

    pub fn mirroring(&self) -> Mirroring {
        self.board.as_mapper().mirroring()
    }

    /// Notify the mapper that the PPU finished fetching a scanline.
    pub fn scanline_irq(&mut self, scanline: u16, rendering_enabled: bool) {
        self.board
            .as_mapper_mut()
            .scanline_irq(scanline, rendering_enabled);
    }

    /// Poll and clear mapper IRQ (e.g. MMC3 scanline IRQ). Returns true if IRQ was pending.
    pub fn poll_irq(&mut self) -> bool {
        self.board.as_mapper_mut().poll_irq()
    }

    /// Current level of the cartridge IRQ line. Unlike [`Cartridge::poll_irq`] this does not
    /// acknowledge anything; the game does that through the mapper's own registers.
    pub fn irq_line(&self) -> bool {
        self.board.as_mapper().irq_line()
    }

    /// Battery RAM contents, when the board has a battery.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        if self.header.battery {
            self.board.as_mapper().prg_ram()
        } else {
            None
        }
    }

    /// Where battery RAM is persisted, if anywhere.
    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    pub fn set_save_path(&mut self, path: impl Into<PathBuf>) {
        self.save_path = Some(path.into());
    }

    /// Write battery RAM to the save file. A no-op for boards without battery or save path.
    pub fn save(&self) -> io::Result<()> {
        match (self.battery_ram(), &self.save_path) {
            (Some(ram), Some(path)) => fs::write(path, ram),
            _ => Ok(()),
        }
    }

    /// Persist battery RAM if it changed since the last flush. Failures are logged, not returned.
    pub fn flush_save(&mut self) {
        if !self.board.as_mapper_mut().take_ram_dirty() {
            return;
        }
        if let Err(e) = self.save() {
            if let Some(path) = &self.save_path {
                warn!("failed to write save file {}: {}", path.display(), e);
            }
        }
    }
}

/// Mapper factory: validates the ROM geometry the board needs, then constructs it.
fn build_board(
    header: &Header,
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    save: Option<&[u8]>,
) -> Result<Board, CartridgeError> {
    let mapper = header.mapper;
    let invalid = |reason: String| CartridgeError::InvalidBankLayout { mapper, reason };
    let fixed_prg = |prg: &[u8]| -> Result<(), CartridgeError> {
        if prg.len() != 0x4000 && prg.len() != 0x8000 {
            return Err(invalid(format!("PRG must be 16 or 32 KiB, got {} KiB", prg.len() / 1024)));
        }
        Ok(())
    };
    let single_chr = |chr: &[u8]| -> Result<(), CartridgeError> {
        if chr.len() != CHR_BANK_SIZE {
            return Err(invalid(format!("CHR must be 8 KiB, got {} KiB", chr.len() / 1024)));
        }
        Ok(())
    };

    let board = match mapper {
        0 => {
            fixed_prg(&prg_rom)?;
            single_chr(&chr)?;
            Board::Nrom(Mapper0::new(prg_rom, chr, chr_is_ram, header.mirroring))
        }
        1 => Board::Mmc1(Mapper1::new(prg_rom, chr, chr_is_ram, save)),
        2 => {
            single_chr(&chr)?;
            Board::Uxrom(Mapper2::new(prg_rom, chr, chr_is_ram, header.mirroring))
        }
        3 => {
            fixed_prg(&prg_rom)?;
            if chr_is_ram {
                return Err(invalid("CNROM requires CHR ROM".into()));
            }
            Board::Cnrom(Mapper3::new(prg_rom, chr, header.mirroring))
        }
        4 => {
            if prg_rom.len() < 0x4000 {
                return Err(invalid("MMC3 needs at least two 8 KiB PRG banks".into()));
            }
            let four_screen = header.mirroring == Mirroring::FourScreen;
            Board::Mmc3(Mapper4::new(prg_rom, chr, chr_is_ram, four_screen, save))
        }
        other => return Err(CartridgeError::UnsupportedMapper(other)),
    };
    Ok(board)
}
