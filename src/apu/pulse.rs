//! Pulse channels ($4000–$4003 = pulse 1, $4004–$4007 = pulse 2).
//!
//! Duty, envelope, sweep, length counter, 11-bit timer. Timer clocked every 2 CPU cycles.
//! See [APU Pulse](https://www.nesdev.org/wiki/APU_Pulse) and
//! [APU Sweep](https://www.nesdev.org/wiki/APU_Sweep).

use crate::apu::{
    CPU_CLOCK_HZ,
    audio::ChannelSnapshot,
    units::{Envelope, LengthCounter},
};

/// Pulse channel duty cycles (8 steps). Duty 0=12.5%, 1=25%, 2=50%, 3=25% negated. Sequencer steps
/// 0→7→6→…→1. Output is volume when step is 1, else 0.
pub const PULSE_DUTY: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], // 12.5%
    [0, 0, 0, 0, 0, 0, 1, 1], // 25%
    [0, 0, 0, 0, 1, 1, 1, 1], // 50%
    [1, 1, 1, 1, 1, 1, 0, 0], // 25% negated
];

/// Largest period the 11-bit timer can hold.
const MAX_PERIOD: u16 = 0x7FF;

/// Which of the two pulse channels; they differ only in how the sweep negates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulseId {
    /// One's-complement negate: `period - change - 1`.
    One,
    /// Two's-complement negate: `period - change`.
    Two,
}

/// Square wave with configurable duty, volume/envelope, frequency sweep, length counter.
#[derive(Debug)]
pub struct Pulse {
    id: PulseId,
    pub enabled: bool,
    pub duty: u8,
    pub envelope: Envelope,
    pub length: LengthCounter,
    pub timer_period: u16,
    timer: u16,
    sequencer_step: u8,
    sweep_enable: bool,
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    sweep_divider: u8,
    sweep_reload: bool,
}

impl Pulse {
    pub fn new(id: PulseId) -> Self {
        Self {
            id,
            enabled: false,
            duty: 0,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            timer_period: 0,
            timer: 0,
            sequencer_step: 0,
            sweep_enable: false,
            sweep_period: 0,
            sweep_negate: false,
            sweep_shift: 0,
            sweep_divider: 0,
            sweep_reload: false,
        }
    }

    /// $4000/$4004: duty, length halt, constant volume, volume/envelope period.
    pub fn write_control(&mut self, data: u8) {
        self.duty = (data >> 6) & 3;
        self.length.halt = data & 0x20 != 0;
        self.envelope.write(data);
    }

    /// $4001/$4005: sweep enable, period, negate, shift.
    pub fn write_sweep(&mut self, data: u8) {
        self.sweep_enable = data & 0x80 != 0;
        self.sweep_period = (data >> 4) & 7;
        self.sweep_negate = data & 0x08 != 0;
        self.sweep_shift = data & 7;
        self.sweep_reload = true;
    }

    /// $4002/$4006: timer low 8 bits.
    pub fn write_timer_low(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x0700) | data as u16;
    }

    /// $4003/$4007: length counter load, timer high 3 bits; restarts envelope and sequencer.
    pub fn write_timer_high(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((data & 7) as u16) << 8;
        if self.enabled {
            self.length.load(data);
        }
        self.envelope.start = true;
        self.sequencer_step = 0;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length.counter = 0;
        }
    }

    /// Period the sweep unit is continuously computing. Negative means underflow.
    pub fn sweep_target(&self) -> i32 {
        let period = self.timer_period as i32;
        let change = period >> self.sweep_shift;
        if !self.sweep_negate {
            return period + change;
        }
        match self.id {
            PulseId::One => period - change - 1,
            PulseId::Two => period - change,
        }
    }

    /// Silenced by the timer/sweep range check, independent of volume and length.
    pub fn muted(&self) -> bool {
        self.timer_period < 8 || self.sweep_target() > MAX_PERIOD as i32
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.clock();
    }

    pub fn clock_length(&mut self) {
        self.length.clock();
    }

    /// Half-frame sweep clock. A target outside 0..=$7FF kills the note.
    pub fn clock_sweep(&mut self) {
        if self.sweep_divider == 0 && self.sweep_enable && self.sweep_shift > 0 {
            let target = self.sweep_target();
            if !(0..=MAX_PERIOD as i32).contains(&target) {
                self.length.counter = 0;
            } else if self.timer_period >= 8 {
                self.timer_period = target as u16;
            }
        }

        if self.sweep_divider == 0 || self.sweep_reload {
            self.sweep_divider = self.sweep_period;
            self.sweep_reload = false;
        } else {
            self.sweep_divider -= 1;
        }
    }

    /// One APU cycle (every other CPU cycle).
    pub fn tick(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.timer_period;
        self.sequencer_step = self.sequencer_step.wrapping_sub(1) & 7;
    }

    pub fn output(&self) -> u8 {
        if !self.audible() || PULSE_DUTY[self.duty as usize][self.sequencer_step as usize] == 0 {
            return 0;
        }
        self.envelope.output()
    }

    fn audible(&self) -> bool {
        self.enabled && self.length.active() && !self.muted()
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        let volume = self.envelope.output();
        if !self.audible() || volume == 0 {
            return ChannelSnapshot::Silent;
        }
        ChannelSnapshot::Pulse {
            frequency: CPU_CLOCK_HZ as f32 / (16.0 * (self.timer_period as f32 + 1.0)),
            duty: self.duty,
            volume,
        }
    }
}
