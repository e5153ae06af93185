//! The assembled console: CPU, bus (PPU, APU, joypads, cartridge) and the audio producers.
//!
//! `Console` owns everything created at power-on. Video is read with [`Console::frame`] after
//! [`Console::run_frame`]; audio is pulled through the [`AudioHandle`] from [`Console::audio`].

use std::{io, sync::Arc};

use log::info;
use thiserror::Error;

use crate::{
    apu::audio::{AudioConfig, AudioEngine, AudioHandle, AudioShared},
    bus::NesBus,
    cartridge::cartridge::{Cartridge, CartridgeError},
    controller::Controller,
    cpu::cpu::{CPU, CpuError},
    ppu::ppu::{HEIGHT, WIDTH},
};

/// Anything that stops the console.
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error("failed to start audio producers: {0}")]
    Audio(#[from] io::Error),
}

pub struct Console {
    cpu: CPU<NesBus>,
    shared: Arc<AudioShared>,
    audio: Option<AudioEngine>,
}

impl Console {
    /// Build the machine around `cart`, start the audio producers, and reset the CPU.
    pub fn power_on(cart: Cartridge, config: AudioConfig) -> Result<Self, EmulatorError> {
        let shared = AudioShared::new(config);
        let engine = AudioEngine::start(Arc::clone(&shared))?;

        let mut cpu = CPU::new(NesBus::with_audio(cart, Arc::clone(&shared)));
        cpu.reset();
        info!(
            "power on: reset vector ${:04X}, audio at {} Hz",
            cpu.pc, config.sample_rate
        );

        Ok(Self {
            cpu,
            shared,
            audio: Some(engine),
        })
    }

    /// Execute one CPU instruction (and the PPU/APU time it took). Returns elapsed CPU cycles.
    pub fn step(&mut self) -> Result<usize, EmulatorError> {
        Ok(self.cpu.step()?)
    }

    /// Run until the PPU completes a frame, then persist battery RAM if it changed.
    pub fn run_frame(&mut self) -> Result<(), EmulatorError> {
        while !self.cpu.bus.frame_ready() {
            self.cpu.step()?;
        }
        self.cpu.bus.clear_frame_ready();
        self.cpu.bus.cart.flush_save();
        Ok(())
    }

    /// Last completed frame: `WIDTH * HEIGHT` RGB pixels.
    pub fn frame(&self) -> &[u8] {
        self.cpu.bus.ppu.frame_buffer()
    }

    pub fn frame_size(&self) -> (usize, usize) {
        (WIDTH, HEIGHT)
    }

    pub fn audio(&self) -> AudioHandle {
        AudioHandle::new(Arc::clone(&self.shared))
    }

    /// Joypad on `port` (0 or 1).
    pub fn controller_mut(&mut self, port: usize) -> Option<&mut Controller> {
        self.cpu.bus.controllers.get_mut(port)
    }

    pub fn cpu(&self) -> &CPU<NesBus> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU<NesBus> {
        &mut self.cpu
    }

    /// Press the reset button.
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Swap cartridges. The outgoing one saves its battery RAM; the CPU is reset into the new one.
    pub fn load_cartridge(&mut self, cart: Cartridge) {
        let mut old = self.cpu.bus.replace_cartridge(cart);
        old.flush_save();
        self.cpu.reset();
        info!("cartridge swapped, reset vector ${:04X}", self.cpu.pc);
    }

    /// Save battery RAM and stop the audio producers. Called on drop if not called explicitly.
    pub fn power_off(&mut self) {
        let Some(mut engine) = self.audio.take() else {
            return;
        };
        self.cpu.bus.cart.flush_save();
        self.cpu.bus.apu.flush_mixed();
        engine.shutdown();
        info!("power off");
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.power_off();
    }
}
