//! DMC channel ($4010–$4013): delta modulation, 7-bit output, sample buffer, CPU stall on fetch.
//! Sample address $C000 + (byte*64); length (byte*16)+1. APU_DMC.

use crate::apu::audio::ChannelSnapshot;

/// DMC rate table (NTSC): 4-bit index from $4010 → CPU cycles per output bit. APU_DMC.
pub const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

#[derive(Debug)]
pub struct Dmc {
    pub irq_enable: bool,
    /// Set when a non-looping sample runs out with IRQ enabled.
    pub irq: bool,
    loop_flag: bool,
    rate_index: u8,
    rate_timer: u16,
    pub output_level: u8,
    start_address: u16,
    sample_length: u16,
    current_address: u16,
    bytes_remaining: u16,
    /// Single-byte sample buffer; filled by the memory reader, emptied into the shift register
    /// when an output cycle starts.
    sample_buffer: Option<u8>,
    shift_register: u8,
    bits_remaining: u8,
    /// True while an output cycle has no sample byte; the level is held.
    silence: bool,
    /// When true, the bus must stall the CPU, read from `fetch_address`, and call `feed_byte`.
    fetch_pending: bool,
    fetch_address: u16,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            irq_enable: false,
            irq: false,
            loop_flag: false,
            rate_index: 0,
            rate_timer: 0,
            output_level: 0,
            start_address: 0xC000,
            sample_length: 1,
            current_address: 0xC000,
            bytes_remaining: 0,
            sample_buffer: None,
            shift_register: 0,
            bits_remaining: 0,
            silence: true,
            fetch_pending: false,
            fetch_address: 0,
        }
    }
}

impl Dmc {
    /// $4010: IRQ enable (bit 7), loop (bit 6), rate index (bits 0–3). Clearing IRQ enable
    /// acknowledges a pending DMC IRQ.
    pub fn write_control(&mut self, data: u8) {
        self.irq_enable = data & 0x80 != 0;
        if !self.irq_enable {
            self.irq = false;
        }
        self.loop_flag = data & 0x40 != 0;
        self.rate_index = data & 0x0F;
    }

    /// $4011: direct load of the 7-bit output level.
    pub fn write_level(&mut self, data: u8) {
        self.output_level = data & 0x7F;
    }

    /// $4012: sample address = $C000 + (value * 64).
    pub fn write_address(&mut self, data: u8) {
        self.start_address = 0xC000 + (data as u16) * 64;
    }

    /// $4013: sample length = (value * 16) + 1 bytes.
    pub fn write_length(&mut self, data: u8) {
        self.sample_length = (data as u16) * 16 + 1;
    }

    /// $4015 bit 4. Disabling drops the rest of the sample; enabling restarts it if it had ended.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.irq = false;
        if !enabled {
            self.bytes_remaining = 0;
            self.fetch_pending = false;
            return;
        }
        if self.bytes_remaining == 0 {
            self.restart();
        }
        self.request_fetch();
    }

    pub fn active(&self) -> bool {
        self.bytes_remaining > 0
    }

    fn restart(&mut self) {
        self.current_address = self.start_address;
        self.bytes_remaining = self.sample_length;
    }

    fn request_fetch(&mut self) {
        if self.sample_buffer.is_none() && self.bytes_remaining > 0 {
            self.fetch_pending = true;
            self.fetch_address = self.current_address;
        }
    }

    pub fn wants_fetch(&self) -> Option<u16> {
        self.fetch_pending.then_some(self.fetch_address)
    }

    /// Byte read by the bus for a pending fetch. The address wraps from $FFFF to $8000.
    pub fn feed_byte(&mut self, byte: u8) {
        self.fetch_pending = false;
        self.sample_buffer = Some(byte);
        self.current_address = match self.current_address {
            0xFFFF => 0x8000,
            addr => addr + 1,
        };
        self.bytes_remaining = self.bytes_remaining.saturating_sub(1);
        if self.bytes_remaining == 0 {
            if self.loop_flag {
                self.restart();
            } else if self.irq_enable {
                self.irq = true;
            }
        }
    }

    /// One CPU cycle: count down the rate timer; on expiry shift one bit into the level and
    /// start a new output cycle after 8 bits.
    pub fn tick(&mut self) {
        if self.rate_timer > 0 {
            self.rate_timer -= 1;
            return;
        }
        self.rate_timer = DMC_RATE_TABLE[self.rate_index as usize] - 1;

        if !self.silence {
            if self.shift_register & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift_register >>= 1;

        self.bits_remaining = self.bits_remaining.saturating_sub(1);
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.sample_buffer.take() {
                Some(byte) => {
                    self.shift_register = byte;
                    self.silence = false;
                }
                None => self.silence = true,
            }
            self.request_fetch();
        }
    }

    /// Mixer input: the 7-bit level, held even while silent.
    pub fn output(&self) -> u8 {
        self.output_level
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot::Dmc {
            level: self.output_level,
        }
    }
}
