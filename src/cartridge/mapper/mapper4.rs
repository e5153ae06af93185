//! Mapper 4 (MMC3): bank switching, switchable mirroring, optional PRG RAM, scanline IRQ.
//!
//! [MMC3](https://www.nesdev.org/wiki/MMC3): Bank select at $8000–$9FFE (even), bank data at
//! $8001–$9FFF (odd). R0/R1 = 2 KiB CHR, R2–R5 = 1 KiB CHR, R6/R7 = 8 KiB PRG. Mirroring at
//! $A000–$BFFE (even). IRQ latch $C000, reload $C001, disable $E000, enable $E001. The IRQ
//! counter is clocked once per rendering scanline by the PPU.

use log::debug;

use crate::cartridge::mapper::{Mirroring, PrgRam, bank_base, mapper::Mapper};

/// MMC3 state: bank registers, mirroring, PRG RAM, IRQ counter/latch/enable.
pub struct Mapper4 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: PrgRam,
    /// Bank select ($8000): bits 0–2 = register index, bit 6 = PRG mode, bit 7 = CHR A12 invert.
    bank_select: u8,
    /// R0–R5 CHR, R6–R7 PRG (R0/R1 are 2 KiB, others 1 KiB / 8 KiB).
    regs: [u8; 8],
    mirroring: Mirroring,
    /// Header-forced four-screen VRAM; the mirroring register is then ignored.
    four_screen: bool,
    /// PRG RAM chip enable (bit 7 of $A001). Reads return open bus while clear.
    prg_ram_enable: bool,
    /// PRG RAM write protect (bit 6 of $A001).
    prg_ram_write_protect: bool,
    /// IRQ latch ($C000), counter, reload flag, enabled ($E001).
    irq_latch: u8,
    irq_counter: u8,
    irq_reload_pending: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl Mapper4 {
    /// Create MMC3 with PRG ROM and CHR ROM/RAM. PRG RAM 8 KiB is allocated for save RAM.
    pub fn new(
        prg_rom: Vec<u8>,
        chr: Vec<u8>,
        chr_is_ram: bool,
        four_screen: bool,
        save: Option<&[u8]>,
    ) -> Self {
        Self {
            prg_rom,
            chr,
            chr_is_ram,
            prg_ram: PrgRam::new(save),
            bank_select: 0,
            regs: [0; 8],
            mirroring: if four_screen {
                Mirroring::FourScreen
            } else {
                Mirroring::Vertical
            },
            four_screen,
            prg_ram_enable: true,
            prg_ram_write_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload_pending: false,
            irq_enabled: false,
            irq_pending: false,
        }
    }

    /// Clock the IRQ counter: reload on request or on reaching zero, otherwise count down.
    fn clock_irq(&mut self, visible: bool) {
        if self.irq_counter == 0 || self.irq_reload_pending {
            self.irq_counter = self.irq_latch;
            self.irq_reload_pending = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled && visible {
            self.irq_pending = true;
        }
    }

    /// 1 KiB CHR bank selected for the 1 KiB slot containing `addr`.
    fn chr_bank_1k(&self, addr: u16) -> usize {
        // Slot index 0–7 in the non-inverted layout; A12 inversion swaps the halves.
        let mut slot = (addr as usize >> 10) & 7;
        if self.bank_select & 0x80 != 0 {
            slot ^= 4;
        }
        match slot {
            0 => (self.regs[0] & 0xFE) as usize,
            1 => (self.regs[0] | 0x01) as usize,
            2 => (self.regs[1] & 0xFE) as usize,
            3 => (self.regs[1] | 0x01) as usize,
            s => self.regs[s - 2] as usize,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        bank_base(self.chr_bank_1k(addr), 0x400, self.chr.len()) + (addr as usize & 0x3FF)
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let len = self.prg_rom.len();
        let bank_count = len / 0x2000;
        let last = bank_count - 1;
        let second_last = last.saturating_sub(1);
        let r6 = (self.regs[6] & 0x3F) as usize;
        let r7 = (self.regs[7] & 0x3F) as usize;
        let prg_mode = self.bank_select & 0x40 != 0;

        let bank = match ((addr as usize - 0x8000) >> 13, prg_mode) {
            (0, false) => r6,
            (0, true) => second_last,
            (1, _) => r7,
            (2, false) => second_last,
            (2, true) => r6,
            _ => last,
        };
        bank_base(bank, 0x2000, len) + (addr as usize & 0x1FFF)
    }
}

impl Mapper for Mapper4 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF if self.prg_ram_enable => self.prg_ram.read(addr),
            0x8000..=0xFFFF => self.prg_rom[self.prg_offset(addr)],
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enable && !self.prg_ram_write_protect {
                    self.prg_ram.write(addr, data);
                }
            }
            0x8000..=0x9FFF => {
                if addr & 1 == 0 {
                    self.bank_select = data;
                } else {
                    let r = (self.bank_select & 7) as usize;
                    self.regs[r] = data;
                    debug!("MMC3 R{} <- {:02X}", r, data);
                }
            }
            0xA000..=0xBFFF => {
                if addr & 1 == 0 {
                    if !self.four_screen {
                        self.mirroring = if data & 1 == 0 {
                            Mirroring::Vertical
                        } else {
                            Mirroring::Horizontal
                        };
                    }
                } else {
                    self.prg_ram_enable = data & 0x80 != 0;
                    self.prg_ram_write_protect = data & 0x40 != 0;
                }
            }
            0xC000..=0xDFFF => {
                if addr & 1 == 0 {
                    self.irq_latch = data;
                } else {
                    self.irq_reload_pending = true;
                    self.irq_counter = 0;
                }
            }
            0xE000..=0xFFFF => {
                if addr & 1 == 0 {
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
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

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// Clocked on the pre-render line and visible lines while rendering; IRQ only on visible lines.
    fn scanline_irq(&mut self, scanline: u16, rendering_enabled: bool) {
        if !rendering_enabled {
            return;
        }
        if scanline < 240 || scanline == 261 {
            self.clock_irq(scanline < 240);
        }
    }

    fn poll_irq(&mut self) -> bool {
        std::mem::take(&mut self.irq_pending)
    }

    fn irq_line(&self) -> bool {
        self.irq_pending
    }

    fn prg_ram(&self) -> Option<&[u8]> {
        Some(self.prg_ram.bytes())
    }

    fn take_ram_dirty(&mut self) -> bool {
        self.prg_ram.take_dirty()
    }
}
