//! Famicore: an NES (Nintendo Entertainment System) emulator core written in Rust.
//!
//! Implements the NES chipset as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): Ricoh 2A03 (CPU+APU),
//! 2C02 PPU, cartridge mappers, and controller I/O.
//!
//! ## Modules (NESdev references)
//!
//! - **apu** – [APU](https://www.nesdev.org/wiki/APU): pulse×2, triangle, noise, DMC, frame
//!   counter, [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer); per-channel producer threads
//!   and ring buffers
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM, PPU, APU,
//!   controllers, cartridge; 3 PPU cycles per CPU cycle, OAM/DMC DMA
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading, battery saves;
//!   [Mapper](https://www.nesdev.org/wiki/Mapper) NROM (0), MMC1 (1), UxROM (2), CNROM (3), MMC3 (4)
//! - **console** – power on/off, frame loop, video and audio accessors
//! - **controller** – [Controller reading](https://www.nesdev.org/wiki/Controller_reading): $4016 latch, shift-out
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: official opcodes, [NMI](https://www.nesdev.org/wiki/NMI), IRQ
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU), [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling),
//!   OAM, nametables, 256×240 RGB

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod console;
pub mod controller;
pub mod cpu;
pub mod ppu;
