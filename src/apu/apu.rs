//! NES APU (Audio Processing Unit) implementation.
//!
//! Implements the [APU](https://www.nesdev.org/wiki/APU) as in the Ricoh 2A03: five channels (pulse×2,
//! triangle, noise, DMC), [frame counter](https://www.nesdev.org/wiki/APU_Frame_Counter) (4-step or
//! 5-step), and [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer) (non-linear). Registers $4000–$4013,
//! $4015, $4017. See [APU registers](https://www.nesdev.org/wiki/APU_registers).
//!
//! ## Timing
//!
//! - Pulse: timer clocked every 2 CPU cycles (APU "half cycle").
//! - Triangle, noise, DMC: timers at CPU rate. Length/envelope/sweep clocked by frame counter (~240 Hz).
//! - DMC: when its sample buffer empties, the bus reads the next byte and stalls the CPU 4 cycles.
//!
//! ## Output
//!
//! Every output sample the channels' snapshots are republished if they changed, and the
//! non-linear mix is queued; queued mix samples go to the shared ring in batches.

use std::sync::Arc;

use log::debug;

use crate::apu::{
    CPU_CLOCK_HZ,
    audio::{AudioConfig, AudioShared, Channel, ChannelSnapshot},
    dmc::Dmc,
    noise::Noise,
    pulse::{Pulse, PulseId},
    triangle::Triangle,
};

/// 4-step frame counter: resets every 29830 CPU cycles. Quarter/half frame at 7457, 14913, 22371;
/// IRQ (if not inhibited) at 29829.
const FRAME_4STEP_RESET: u32 = 29830;

/// 5-step frame counter: no IRQ; resets every 37282 cycles. Extra half-frame at 37281.
const FRAME_5STEP_RESET: u32 = 37282;

/// Mixed samples queued before they are pushed to the shared ring.
const MIX_BATCH: usize = 256;

const STATUS_FRAME_IRQ: u8 = 0x40;
const STATUS_DMC_IRQ: u8 = 0x80;

/// Pulse output: 95.52 / (8128/n + 100), n = pulse1 + pulse2 (0–30).
fn pulse_table(n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }
    95.52 / (8128.0 / (n as f32) + 100.0)
}

/// TND (triangle + noise + DMC) output: 163.67 / (24329/n + 100), n = 3*tri + 2*noise + dmc.
fn tnd_table(n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }
    163.67 / (24329.0 / (n as f32) + 100.0)
}

/// APU state: the five channels, the frame counter, and the link to the audio output.
/// `tick(cycles)` advances the frame counter and channel timers and emits samples when due.
pub struct APU {
    pub(crate) pulse1: Pulse,
    pub(crate) pulse2: Pulse,
    pub(crate) triangle: Triangle,
    pub(crate) noise: Noise,
    pub(crate) dmc: Dmc,
    frame_irq: bool,
    frame_irq_inhibit: bool,
    frame_4step: bool,
    frame_cycle: u32,
    cycles_per_sample: f64,
    sample_phase: f64,
    mix_batch: Vec<f32>,
    published: [ChannelSnapshot; 5],
    shared: Arc<AudioShared>,
}

impl Default for APU {
    fn default() -> Self {
        Self::new()
    }
}

impl APU {
    /// APU publishing into a private audio sink with the default configuration.
    pub fn new() -> Self {
        Self::with_audio(AudioShared::new(AudioConfig::default()))
    }

    pub fn with_audio(shared: Arc<AudioShared>) -> Self {
        let sample_rate = shared.config.sample_rate.max(1) as f64;
        Self {
            pulse1: Pulse::new(PulseId::One),
            pulse2: Pulse::new(PulseId::Two),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame_irq: false,
            frame_irq_inhibit: false,
            frame_4step: true,
            frame_cycle: 0,
            cycles_per_sample: CPU_CLOCK_HZ / sample_rate,
            sample_phase: 0.0,
            mix_batch: Vec::with_capacity(MIX_BATCH),
            published: [ChannelSnapshot::Silent; 5],
            shared,
        }
    }

    /// Write to APU registers. $4000–$4013 = channel regs; $4015 = channel enables;
    /// $4017 = frame counter (mode 4/5-step, IRQ inhibit). Writing $4017 resets frame counter.
    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000 => self.pulse1.write_control(data),
            0x4001 => self.pulse1.write_sweep(data),
            0x4002 => self.pulse1.write_timer_low(data),
            0x4003 => self.pulse1.write_timer_high(data),
            0x4004 => self.pulse2.write_control(data),
            0x4005 => self.pulse2.write_sweep(data),
            0x4006 => self.pulse2.write_timer_low(data),
            0x4007 => self.pulse2.write_timer_high(data),
            0x4008 => self.triangle.write_linear(data),
            0x400A => self.triangle.write_timer_low(data),
            0x400B => self.triangle.write_timer_high(data),
            0x400C => self.noise.write_control(data),
            0x400E => self.noise.write_period(data),
            0x400F => self.noise.write_length(data),
            0x4010 => self.dmc.write_control(data),
            0x4011 => self.dmc.write_level(data),
            0x4012 => self.dmc.write_address(data),
            0x4013 => self.dmc.write_length(data),
            0x4015 => {
                self.pulse1.set_enabled(data & 0x01 != 0);
                self.pulse2.set_enabled(data & 0x02 != 0);
                self.triangle.set_enabled(data & 0x04 != 0);
                self.noise.set_enabled(data & 0x08 != 0);
                self.dmc.set_enabled(data & 0x10 != 0);
            }
            0x4017 => {
                self.frame_4step = data & 0x80 == 0;
                self.frame_irq_inhibit = data & 0x40 != 0;
                self.frame_cycle = 0;
                if self.frame_irq_inhibit {
                    self.frame_irq = false;
                }
                debug!(
                    "APU frame counter: {}-step, IRQ {}",
                    if self.frame_4step { 4 } else { 5 },
                    if self.frame_irq_inhibit { "inhibited" } else { "enabled" }
                );
                // Selecting 5-step mode clocks a quarter and a half frame right away
                // (3–4 cycles later on hardware).
                if !self.frame_4step {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
            }
            _ => {}
        }
        self.publish_snapshots();
    }

    /// Read $4015: bits 0–3 = length counter > 0 for pulse1, pulse2, triangle, noise; bit 4 = DMC
    /// has bytes remaining; bit 6 = frame IRQ; bit 7 = DMC IRQ. Reading clears the frame IRQ.
    pub fn read_status(&mut self) -> u8 {
        let mut r = 0;
        if self.pulse1.length.active() {
            r |= 0x01;
        }
        if self.pulse2.length.active() {
            r |= 0x02;
        }
        if self.triangle.length.active() {
            r |= 0x04;
        }
        if self.noise.length.active() {
            r |= 0x08;
        }
        if self.dmc.active() {
            r |= 0x10;
        }
        if self.frame_irq {
            r |= STATUS_FRAME_IRQ;
        }
        if self.dmc.irq {
            r |= STATUS_DMC_IRQ;
        }
        self.frame_irq = false;
        r
    }

    /// Frame or DMC interrupt asserted. Level-triggered: stays set until acknowledged.
    pub fn irq_pending(&self) -> bool {
        self.frame_irq || self.dmc.irq
    }

    /// DMC memory reader: `Some(addr)` when the sample buffer needs the next byte.
    /// The bus reads it, stalls the CPU, and hands it back through `dmc_feed_byte`.
    pub fn dmc_wants_fetch(&self) -> Option<u16> {
        self.dmc.wants_fetch()
    }

    pub fn dmc_feed_byte(&mut self, byte: u8) {
        self.dmc.feed_byte(byte);
    }

    /// Quarter-frame: clock envelope (pulse, noise) and triangle linear counter.
    fn clock_quarter_frame(&mut self) {
        self.pulse1.clock_envelope();
        self.pulse2.clock_envelope();
        self.noise.clock_envelope();
        self.triangle.clock_linear();
    }

    /// Half-frame: clock length counters and sweep units.
    fn clock_half_frame(&mut self) {
        self.pulse1.clock_length();
        self.pulse2.clock_length();
        self.triangle.clock_length();
        self.noise.clock_length();
        self.pulse1.clock_sweep();
        self.pulse2.clock_sweep();
    }

    fn clock_frame_counter(&mut self) {
        self.frame_cycle += 1;
        match (self.frame_cycle, self.frame_4step) {
            (7457, _) | (22371, _) => self.clock_quarter_frame(),
            (14913, _) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
            }
            (29829, true) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
                if !self.frame_irq_inhibit {
                    self.frame_irq = true;
                }
            }
            (37281, false) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
            }
            _ => {}
        }
        let reset = if self.frame_4step {
            FRAME_4STEP_RESET
        } else {
            FRAME_5STEP_RESET
        };
        if self.frame_cycle >= reset {
            self.frame_cycle = 0;
        }
    }

    /// Non-linear mix of the current channel outputs, 0.0..=1.0.
    pub fn mix(&self) -> f32 {
        let pulse = (self.pulse1.output() + self.pulse2.output()) as usize;
        let tnd = 3 * self.triangle.output() as usize
            + 2 * self.noise.output() as usize
            + self.dmc.output() as usize;
        pulse_table(pulse) + tnd_table(tnd)
    }

    /// Advance APU by `cycles` CPU cycles: frame counter, channel timers, mixer.
    pub fn tick(&mut self, cycles: usize) {
        for _ in 0..cycles {
            self.clock_frame_counter();

            if self.frame_cycle % 2 == 0 {
                self.pulse1.tick();
                self.pulse2.tick();
            }
            self.triangle.tick();
            self.noise.tick();
            self.dmc.tick();

            self.sample_phase += 1.0;
            if self.sample_phase >= self.cycles_per_sample {
                self.sample_phase -= self.cycles_per_sample;
                self.emit_sample();
            }
        }
    }

    fn emit_sample(&mut self) {
        self.publish_snapshots();
        self.mix_batch.push(self.mix());
        if self.mix_batch.len() >= MIX_BATCH {
            self.flush_mixed();
        }
    }

    /// Push queued mixed samples to the shared ring.
    pub fn flush_mixed(&mut self) {
        if !self.mix_batch.is_empty() {
            self.shared.mixed.write(&self.mix_batch);
            self.mix_batch.clear();
        }
    }

    fn publish_snapshots(&mut self) {
        let current = [
            self.pulse1.snapshot(),
            self.pulse2.snapshot(),
            self.triangle.snapshot(),
            self.noise.snapshot(),
            self.dmc.snapshot(),
        ];
        for (channel, snapshot) in Channel::ALL.into_iter().zip(current) {
            let last = &mut self.published[channel.index()];
            if *last != snapshot {
                *last = snapshot;
                self.shared.channel(channel).publish(snapshot);
            }
        }
    }
}
