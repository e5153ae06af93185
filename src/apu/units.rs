//! Building blocks shared by several channels: the length counter and the volume envelope.

/// Length counter lookup table: 5-bit index from register → count. APU_Length_Counter.
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Counts down on half frames and silences the channel at zero unless halted.
#[derive(Clone, Copy, Debug, Default)]
pub struct LengthCounter {
    pub counter: u8,
    pub halt: bool,
}

impl LengthCounter {
    /// Load from the 5-bit index in bits 3–7 of a channel's last register write.
    pub fn load(&mut self, data: u8) {
        self.counter = LENGTH_TABLE[(data >> 3) as usize & 0x1F];
    }

    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    pub fn active(&self) -> bool {
        self.counter > 0
    }
}

/// Envelope generator used by the pulse and noise channels. APU_Envelope.
#[derive(Clone, Copy, Debug, Default)]
pub struct Envelope {
    pub start: bool,
    /// Shares its bit with the length counter halt flag.
    pub looping: bool,
    pub constant_volume: bool,
    /// Constant volume, or the divider period when the envelope is running.
    pub volume: u8,
    divider: u8,
    decay: u8,
}

impl Envelope {
    /// Low 6 bits of $4000/$4004/$400C: loop, constant volume, volume/period.
    pub fn write(&mut self, data: u8) {
        self.looping = data & 0x20 != 0;
        self.constant_volume = data & 0x10 != 0;
        self.volume = data & 0x0F;
    }

    /// Clocked on quarter frames.
    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
        } else if self.divider > 0 {
            self.divider -= 1;
        } else {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        }
    }

    pub fn output(&self) -> u8 {
        if self.constant_volume {
            self.volume
        } else {
            self.decay
        }
    }
}
