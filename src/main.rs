//! NES emulator entry point.
//!
//! Loads a cartridge and runs the console with a display window and audio output.
//! Usage: famicore path/to/game.nes
//!
//! Keys: arrows = D-pad, Z = B, X = A, Right Shift = Select, Enter = Start, Escape = quit.

use std::{
    env,
    error::Error,
    process,
    time::{Duration, Instant},
};

use ansi_term::Colour::{Red, Yellow};
use famicore::{
    apu::audio::{AudioConfig, AudioHandle},
    cartridge::cartridge::Cartridge,
    console::Console,
    controller::Buttons,
};
use log::{error, warn};
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};
use rodio::{OutputStream, Sink, Source};

/// NES runs at ~60.0988 Hz (NTSC). Target one frame per 16.67 ms for ~60 fps.
const FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

const KEYMAP: [(Key, Buttons); 8] = [
    (Key::X, Buttons::A),
    (Key::Z, Buttons::B),
    (Key::RightShift, Buttons::SELECT),
    (Key::Enter, Buttons::START),
    (Key::Up, Buttons::UP),
    (Key::Down, Buttons::DOWN),
    (Key::Left, Buttons::LEFT),
    (Key::Right, Buttons::RIGHT),
];

/// Mono source for rodio that pulls the console's pre-mixed stream.
struct MixedSource {
    audio: AudioHandle,
    buffer: Vec<f32>,
    pos: usize,
}

impl MixedSource {
    fn new(audio: AudioHandle) -> Self {
        Self {
            audio,
            buffer: vec![0.0; 512],
            pos: 512,
        }
    }
}

impl Iterator for MixedSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos == self.buffer.len() {
            // Under-runs come back as silence; the device never waits on the emulator.
            self.audio.read_mixed(&mut self.buffer);
            self.pos = 0;
        }
        let sample = self.buffer[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for MixedSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.audio.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{e}");
        eprintln!("{} {e}", Red.bold().paint("ERROR"));
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let Some(path) = env::args().nth(1) else {
        eprintln!("{} famicore path/to/game.nes", Yellow.bold().paint("usage:"));
        process::exit(2);
    };

    let cart = Cartridge::load(&path)?;
    let mut console = Console::power_on(cart, AudioConfig::default())?;

    // Keep the stream alive for as long as the sink plays.
    let _output = match OutputStream::try_default() {
        Ok((stream, handle)) => match Sink::try_new(&handle) {
            Ok(sink) => {
                sink.append(MixedSource::new(console.audio()));
                Some((stream, sink))
            }
            Err(e) => {
                warn!("audio disabled: {e}");
                None
            }
        },
        Err(e) => {
            warn!("audio disabled: {e}");
            None
        }
    };

    let (width, height) = console.frame_size();
    let mut window = Window::new(
        "Famicore",
        width,
        height,
        WindowOptions {
            resize: true,
            scale: Scale::X2,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        },
    )?;
    let mut pixels = vec![0u32; width * height];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let frame_start = Instant::now();

        if let Some(pad) = console.controller_mut(0) {
            pad.buttons = KEYMAP
                .iter()
                .filter(|(key, _)| window.is_key_down(*key))
                .fold(Buttons::empty(), |acc, (_, button)| acc | *button);
        }

        console.run_frame()?;

        for (dst, rgb) in pixels.iter_mut().zip(console.frame().chunks_exact(3)) {
            *dst = (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
        }
        window.update_with_buffer(&pixels, width, height)?;

        // Pace to ~60 fps so we don't burn CPU (emulation is far faster than real NES)
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    console.power_off();
    Ok(())
}
