//! Memory bus and address decoding for the NES.
//!
//! Maps CPU addresses to RAM, PPU registers, APU registers, controllers, and cartridge.
//! Also drives the rest of the machine forward after each CPU instruction: 3 PPU dots and
//! 1 APU cycle per CPU cycle, and DMC sample fetches.

use std::{mem, sync::Arc};

use crate::{
    apu::{apu::APU, audio::AudioShared},
    cartridge::cartridge::Cartridge,
    controller::Controller,
    ppu::ppu::{OAM_LEN, PPU},
};

/// Value returned for reads of unmapped addresses.
pub const OPEN_BUS: u8 = 0;

/// CPU cycles the CPU is halted for an OAM DMA (one more when it starts on an odd cycle).
const OAM_DMA_CYCLES: usize = 513;
/// CPU cycles stolen by each DMC sample fetch.
const DMC_FETCH_CYCLES: usize = 4;

/// Trait for memory-mapped I/O and bus access used by the CPU.
///
/// Only `read` and `write` are required; the timing and interrupt hooks default to a bus
/// with nothing else attached.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Little-endian 16-bit read.
    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Little-endian 16-bit write.
    fn write_word(&mut self, addr: u16, data: u16) {
        self.write(addr, data as u8);
        self.write(addr.wrapping_add(1), (data >> 8) as u8);
    }

    /// Advance everything clocked off the CPU by `cycles` CPU cycles.
    fn tick(&mut self, _cycles: usize) {}

    /// Consume a pending NMI edge.
    fn poll_nmi(&mut self) -> bool {
        false
    }

    /// True while an IRQ source is asserted. Only polled when interrupts are enabled.
    fn poll_irq(&mut self) -> bool {
        false
    }

    /// CPU cycles stolen by DMA since the last call.
    fn take_stall(&mut self) -> usize {
        0
    }
}

/// Main NES bus: RAM, PPU, APU, cartridge, and two controller ports.
pub struct NesBus {
    pub ram: [u8; 2048],
    pub cart: Cartridge,
    pub ppu: PPU,
    pub apu: APU,
    pub controllers: [Controller; 2],
    stall: usize,
    /// CPU cycles elapsed since power-on; its parity decides the OAM DMA alignment cycle.
    cycles: u64,
    frame_ready: bool,
}

impl NesBus {
    /// Create a new bus with the given cartridge and a default audio configuration.
    pub fn new(cart: Cartridge) -> Self {
        Self::with_apu(cart, APU::new())
    }

    /// Create a bus whose APU publishes into `audio`.
    pub fn with_audio(cart: Cartridge, audio: Arc<AudioShared>) -> Self {
        Self::with_apu(cart, APU::with_audio(audio))
    }

    fn with_apu(cart: Cartridge, apu: APU) -> Self {
        Self {
            ram: [0; 2048],
            cart,
            ppu: PPU::new(),
            apu,
            controllers: [Controller::new(), Controller::new()],
            stall: 0,
            cycles: 0,
            frame_ready: false,
        }
    }

    /// True once the PPU has wrapped from the pre-render line; the framebuffer holds a full frame.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Clear frame_ready after presenting (so the next frame can set it).
    pub fn clear_frame_ready(&mut self) {
        self.frame_ready = false;
    }

    /// Swap in a new cartridge. The old one is returned so the caller can persist it.
    pub fn replace_cartridge(&mut self, cart: Cartridge) -> Cartridge {
        mem::replace(&mut self.cart, cart)
    }

    /// $4014: copy page `$XX00-$XXFF` into OAM and halt the CPU for the transfer.
    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        let mut data = [0u8; OAM_LEN];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.read(base | i as u16);
        }
        self.ppu.oam_dma(&data);
        self.stall += OAM_DMA_CYCLES + (self.cycles & 1) as usize;
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self.ppu.read_register(&mut self.cart, addr & 0x0007),
            0x4015 => self.apu.read_status(),
            0x4016 => self.controllers[0].read(),
            0x4017 => self.controllers[1].read(),
            // Write-only APU registers, test registers, expansion area
            0x4000..=0x5FFF => OPEN_BUS,
            // PRG RAM and PRG ROM
            0x6000..=0xFFFF => self.cart.read_prg(addr),
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = data,
            0x2000..=0x3FFF => self.ppu.write_register(&mut self.cart, addr & 0x0007, data),
            0x4014 => self.oam_dma(data),
            // Strobe goes to both pads.
            0x4016 => {
                self.controllers[0].write(data);
                self.controllers[1].write(data);
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, data),
            0x4018..=0x5FFF => {}
            // PRG RAM and mapper registers
            0x6000..=0xFFFF => self.cart.write_prg(addr, data),
        }
    }

    fn tick(&mut self, cycles: usize) {
        for _ in 0..cycles {
            self.cycles += 1;
            if self.ppu.tick(&mut self.cart, 1) {
                self.frame_ready = true;
            }

            self.apu.tick(1);
            if let Some(addr) = self.apu.dmc_wants_fetch() {
                let byte = self.read(addr);
                self.apu.dmc_feed_byte(byte);
                self.stall += DMC_FETCH_CYCLES;
            }
        }
    }

    fn poll_nmi(&mut self) -> bool {
        self.ppu.poll_nmi()
    }

    /// Cartridge and APU IRQs are levels; each source is acknowledged through its own registers.
    fn poll_irq(&mut self) -> bool {
        self.cart.irq_line() || self.apu.irq_pending()
    }

    fn take_stall(&mut self) -> usize {
        mem::take(&mut self.stall)
    }
}
