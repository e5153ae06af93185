//! Audio producers and the boundary the output device reads from.
//!
//! The APU owns all channel state on the CPU thread. Whenever a channel's audible parameters
//! change it publishes a [`ChannelSnapshot`] into [`AudioShared`]. One producer thread per
//! channel turns the latest snapshot into blocks of samples in that channel's [`RingBuffer`],
//! only while the ring is below its low watermark. The pre-mixed stream is written by the APU
//! itself. Readers go through an [`AudioHandle`] and never wait on a producer.

use std::{
    io,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, warn};

use crate::apu::{
    noise::step_lfsr, pulse::PULSE_DUTY, ring_buffer::RingBuffer, triangle::TRIANGLE_SEQUENCE,
};

/// How long an idle producer sleeps before checking its ring again.
const IDLE_PARK: Duration = Duration::from_millis(1);

/// Audio output settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioConfig {
    /// Output sample rate in Hz, for both the per-channel and the pre-mixed streams.
    pub sample_rate: u32,
    /// Samples each ring can hold.
    pub ring_capacity: usize,
    /// Samples a producer renders per refill.
    pub block_size: usize,
    /// Producers refill while fewer than this many samples are buffered.
    pub low_watermark: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            ring_capacity: 8192,
            block_size: 512,
            low_watermark: 2048,
        }
    }
}

impl AudioConfig {
    /// Settings a producer can satisfy: the watermark never exceeds the ring capacity and
    /// blocks hold at least one sample.
    pub fn sanitized(self) -> Self {
        let ring_capacity = self.ring_capacity.max(1);
        Self {
            sample_rate: self.sample_rate.max(1),
            ring_capacity,
            block_size: self.block_size.clamp(1, ring_capacity),
            low_watermark: self.low_watermark.min(ring_capacity),
        }
    }
}

/// The five sound generators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Pulse1,
    Pulse2,
    Triangle,
    Noise,
    Dmc,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Pulse1,
        Channel::Pulse2,
        Channel::Triangle,
        Channel::Noise,
        Channel::Dmc,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn thread_name(self) -> &'static str {
        match self {
            Channel::Pulse1 => "apu-pulse1",
            Channel::Pulse2 => "apu-pulse2",
            Channel::Triangle => "apu-triangle",
            Channel::Noise => "apu-noise",
            Channel::Dmc => "apu-dmc",
        }
    }
}

/// Immutable view of what a channel is currently playing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ChannelSnapshot {
    #[default]
    Silent,
    Pulse {
        frequency: f32,
        duty: u8,
        volume: u8,
    },
    Triangle {
        frequency: f32,
    },
    Noise {
        /// LFSR clocks per second.
        rate: f32,
        short_mode: bool,
        volume: u8,
    },
    Dmc {
        level: u8,
    },
}

/// One channel's published snapshot and its sample ring.
pub struct ChannelStream {
    snapshot: RwLock<ChannelSnapshot>,
    pub ring: RingBuffer,
}

impl ChannelStream {
    fn new(capacity: usize) -> Self {
        Self {
            snapshot: RwLock::new(ChannelSnapshot::Silent),
            ring: RingBuffer::new(capacity),
        }
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        *self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, snapshot: ChannelSnapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

/// State shared between the APU, the producer threads, and the audio output.
pub struct AudioShared {
    pub config: AudioConfig,
    channels: [ChannelStream; 5],
    /// Non-linear mix of all channels, written by the APU.
    pub mixed: RingBuffer,
    shutdown: AtomicBool,
}

impl AudioShared {
    pub fn new(config: AudioConfig) -> Arc<Self> {
        let config = config.sanitized();
        let capacity = config.ring_capacity;
        Arc::new(Self {
            config,
            channels: std::array::from_fn(|_| ChannelStream::new(capacity)),
            mixed: RingBuffer::new(capacity),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn channel(&self, channel: Channel) -> &ChannelStream {
        &self.channels[channel.index()]
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

/// Cloneable, thread-safe reader for the audio output side.
#[derive(Clone)]
pub struct AudioHandle {
    shared: Arc<AudioShared>,
}

impl AudioHandle {
    pub fn new(shared: Arc<AudioShared>) -> Self {
        Self { shared }
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.config.sample_rate
    }

    /// Pull samples from one channel. Returns the count that was buffered; the rest of `out`
    /// is silence.
    pub fn read_channel(&self, channel: Channel, out: &mut [f32]) -> usize {
        self.shared.channel(channel).ring.read(out)
    }

    /// Pull samples from the pre-mixed stream, padding under-runs with silence.
    pub fn read_mixed(&self, out: &mut [f32]) -> usize {
        self.shared.mixed.read(out)
    }
}

/// Owns the per-channel producer threads. Dropping it stops and joins them.
pub struct AudioEngine {
    shared: Arc<AudioShared>,
    workers: Vec<JoinHandle<()>>,
}

impl AudioEngine {
    /// Spawn one producer per channel.
    pub fn start(shared: Arc<AudioShared>) -> io::Result<Self> {
        shared.shutdown.store(false, Ordering::Release);
        let mut engine = Self {
            shared,
            workers: Vec::with_capacity(Channel::ALL.len()),
        };
        for channel in Channel::ALL {
            let shared = Arc::clone(&engine.shared);
            // On failure, `engine` drops here and joins whatever already started.
            let worker = thread::Builder::new()
                .name(channel.thread_name().to_string())
                .spawn(move || produce(&shared, channel))?;
            engine.workers.push(worker);
        }
        debug!("started {} audio producers", engine.workers.len());
        Ok(engine)
    }

    pub fn handle(&self) -> AudioHandle {
        AudioHandle::new(Arc::clone(&self.shared))
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Signal every producer and wait for it to exit.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.shutdown.store(true, Ordering::Release);
        for worker in &self.workers {
            worker.thread().unpark();
        }
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("audio").to_string();
            if worker.join().is_err() {
                warn!("audio producer {name} panicked");
            }
        }
        debug!("audio producers stopped");
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Producer loop: refill the ring a block at a time while it is low, otherwise idle.
fn produce(shared: &AudioShared, channel: Channel) {
    let config = shared.config;
    let stream = shared.channel(channel);
    let mut voice = Voice::default();
    let mut block = vec![0.0; config.block_size];

    while !shared.is_shutdown() {
        if stream.ring.available() < config.low_watermark {
            voice.render(stream.snapshot(), config.sample_rate as f32, &mut block);
            stream.ring.write(&block);
        } else {
            thread::park_timeout(IDLE_PARK);
        }
    }
}

/// Oscillator state carried between blocks so waveforms stay continuous.
#[derive(Debug)]
struct Voice {
    phase: f32,
    lfsr: u16,
}

impl Default for Voice {
    fn default() -> Self {
        Self { phase: 0.0, lfsr: 1 }
    }
}

impl Voice {
    /// Render `out.len()` samples of `snapshot` in 0.0..=1.0.
    fn render(&mut self, snapshot: ChannelSnapshot, sample_rate: f32, out: &mut [f32]) {
        match snapshot {
            ChannelSnapshot::Silent => out.fill(0.0),
            ChannelSnapshot::Pulse {
                frequency,
                duty,
                volume,
            } => {
                let step = frequency / sample_rate;
                let level = volume as f32 / 15.0;
                let wave = &PULSE_DUTY[duty as usize & 3];
                for sample in out.iter_mut() {
                    let index = (self.phase * 8.0) as usize & 7;
                    *sample = wave[index] as f32 * level;
                    self.phase = (self.phase + step).fract();
                }
            }
            ChannelSnapshot::Triangle { frequency } => {
                let step = frequency / sample_rate;
                for sample in out.iter_mut() {
                    let index = (self.phase * 32.0) as usize & 31;
                    *sample = TRIANGLE_SEQUENCE[index] as f32 / 15.0;
                    self.phase = (self.phase + step).fract();
                }
            }
            ChannelSnapshot::Noise {
                rate,
                short_mode,
                volume,
            } => {
                let clocks_per_sample = rate / sample_rate;
                let level = volume as f32 / 15.0;
                for sample in out.iter_mut() {
                    self.phase += clocks_per_sample;
                    while self.phase >= 1.0 {
                        self.lfsr = step_lfsr(self.lfsr, short_mode);
                        self.phase -= 1.0;
                    }
                    *sample = if self.lfsr & 1 == 0 { level } else { 0.0 };
                }
            }
            ChannelSnapshot::Dmc { level } => out.fill(level as f32 / 127.0),
        }
    }
}
