//! Triangle channel ($4008–$400B): linear counter (7-bit), length counter, 32-step triangle wave.
//! Timer runs at CPU cycle rate (one octave below pulse for same period).

use crate::apu::{CPU_CLOCK_HZ, audio::ChannelSnapshot, units::LengthCounter};

/// Triangle channel 32-step waveform: 15 down to 0, then 0 up to 15. No volume control.
pub const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
    13, 14, 15,
];

#[derive(Debug, Default)]
pub struct Triangle {
    pub enabled: bool,
    pub length: LengthCounter,
    /// Control flag: halts the length counter and keeps the linear counter reloading.
    control: bool,
    linear_load: u8,
    pub linear_counter: u8,
    linear_reload: bool,
    pub timer_period: u16,
    timer: u16,
    sequencer_step: u8,
}

impl Triangle {
    /// $4008: control flag, linear counter load value.
    pub fn write_linear(&mut self, data: u8) {
        self.control = data & 0x80 != 0;
        self.length.halt = self.control;
        self.linear_load = data & 0x7F;
    }

    /// $400A: timer low 8 bits.
    pub fn write_timer_low(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0xFF00) | data as u16;
    }

    /// $400B: length counter load, timer high 3 bits; sets linear reload flag.
    pub fn write_timer_high(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((data & 7) as u16) << 8;
        if self.enabled {
            self.length.load(data);
        }
        self.linear_reload = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length.counter = 0;
        }
    }

    pub fn clock_length(&mut self) {
        self.length.clock();
    }

    /// Quarter-frame linear counter clock.
    pub fn clock_linear(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_load;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    /// One CPU cycle. The sequencer only advances while both counters are non-zero.
    pub fn tick(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.timer_period;
        if self.length.active() && self.linear_counter > 0 {
            self.sequencer_step = (self.sequencer_step + 1) & 31;
        }
    }

    pub fn output(&self) -> u8 {
        if !self.audible() {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.sequencer_step as usize]
    }

    // Periods below 2 are ultrasonic; treat them as silence rather than a DC pop.
    fn audible(&self) -> bool {
        self.enabled && self.length.active() && self.linear_counter > 0 && self.timer_period >= 2
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        if !self.audible() {
            return ChannelSnapshot::Silent;
        }
        ChannelSnapshot::Triangle {
            frequency: CPU_CLOCK_HZ as f32 / (32.0 * (self.timer_period as f32 + 1.0)),
        }
    }
}
