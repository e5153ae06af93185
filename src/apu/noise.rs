//! Noise channel ($400C–$400F): envelope, 15-bit LFSR, period from $400E, length counter.

use crate::apu::{
    CPU_CLOCK_HZ,
    audio::ChannelSnapshot,
    units::{Envelope, LengthCounter},
};

/// Noise channel period table (NTSC): 4-bit index from $400E → period in CPU cycles. APU_Noise.
pub const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// Pseudo-random output from a 15-bit LFSR; mode bit shortens the sequence (metallic tone).
#[derive(Debug)]
pub struct Noise {
    pub enabled: bool,
    pub envelope: Envelope,
    pub length: LengthCounter,
    pub short_mode: bool,
    period_index: u8,
    timer: u16,
    shift: u16,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            enabled: false,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            short_mode: false,
            period_index: 0,
            timer: 0,
            // The LFSR is loaded with 1 at power-up.
            shift: 1,
        }
    }
}

impl Noise {
    /// $400C: length halt, constant volume, volume/envelope.
    pub fn write_control(&mut self, data: u8) {
        self.length.halt = data & 0x20 != 0;
        self.envelope.write(data);
    }

    /// $400E: LFSR mode (bit 7), period index (bits 0–3).
    pub fn write_period(&mut self, data: u8) {
        self.short_mode = data & 0x80 != 0;
        self.period_index = data & 0x0F;
    }

    /// $400F: length counter load; restarts envelope.
    pub fn write_length(&mut self, data: u8) {
        if self.enabled {
            self.length.load(data);
        }
        self.envelope.start = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length.counter = 0;
        }
    }

    pub fn period(&self) -> u16 {
        NOISE_PERIOD_TABLE[self.period_index as usize]
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.clock();
    }

    pub fn clock_length(&mut self) {
        self.length.clock();
    }

    pub fn tick(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.period();
        self.shift = step_lfsr(self.shift, self.short_mode);
    }

    pub fn output(&self) -> u8 {
        if !self.enabled || !self.length.active() || self.shift & 1 != 0 {
            return 0;
        }
        self.envelope.output()
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        let volume = self.envelope.output();
        if !self.enabled || !self.length.active() || volume == 0 {
            return ChannelSnapshot::Silent;
        }
        ChannelSnapshot::Noise {
            rate: CPU_CLOCK_HZ as f32 / self.period() as f32,
            short_mode: self.short_mode,
            volume,
        }
    }
}

/// Advance a 15-bit LFSR once. Feedback taps bit 1, or bit 6 in short mode.
pub fn step_lfsr(shift: u16, short_mode: bool) -> u16 {
    let tap = if short_mode { 6 } else { 1 };
    let feedback = (shift & 1) ^ ((shift >> tap) & 1);
    (shift >> 1) | (feedback << 14)
}
