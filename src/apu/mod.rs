//! NES APU (Audio Processing Unit) emulation.
//!
//! - **Pulse** (×2): square waves with duty, envelope, sweep, length counter.
//! - **Triangle**: 32-step wave, linear counter, length counter.
//! - **Noise**: LFSR-based, envelope, length counter.
//! - **DMC**: 1-bit delta samples fetched from PRG through the bus.
//! - **Frame counter**: 4-step or 5-step mode; clocks envelope/linear/length/sweep.
//! - **Mixer**: NES-style non-linear mix at the configured output rate.
//! - **Audio**: per-channel producer threads and ring buffers read by the output device.

pub mod apu;
pub mod audio;
pub mod dmc;
pub mod noise;
pub mod pulse;
pub mod ring_buffer;
pub mod triangle;
pub mod units;


/// NTSC CPU clock (Hz); the APU runs off the same clock.
pub const CPU_CLOCK_HZ: f64 = 1_789_773.0;
