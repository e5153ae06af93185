//! NES PPU (Picture Processing Unit) implementation.
//!
//! A dot-stepped 2C02: 341 dots per scanline, 262 scanlines per frame. Scrolling follows the
//! loopy register model (`v`, `t`, fine X, write toggle). Background tiles stream through 16-bit
//! shift registers; sprites are evaluated at dot 257 for the next scanline. Finished scanlines
//! are committed to a 256×240 RGB framebuffer. Registers: $2000–$2007 (mirrored).

use crate::cartridge::{cartridge::Cartridge, mapper::Mirroring};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const VBLANK_SCANLINE: u16 = 241;
pub const PRERENDER_SCANLINE: u16 = 261;

/// NES 2C02-style 64-color palette (0xRRGGBB). Index 0 = backdrop.
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x3C7EEC, 0x5C5CEC, 0x8844EC,
    0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458, 0x209A88,
    0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4,
    0xEC9CB4, 0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000,
    0x000000,
];

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;

const CTRL_NAMETABLE: u8 = 0x03;
const CTRL_INCREMENT_32: u8 = 0x04;
const CTRL_SPRITE_TABLE: u8 = 0x08;
const CTRL_BG_TABLE: u8 = 0x10;
const CTRL_SPRITE_16: u8 = 0x20;
const CTRL_NMI: u8 = 0x80;

const MASK_GREYSCALE: u8 = 0x01;
const MASK_BG_LEFT: u8 = 0x02;
const MASK_SPRITE_LEFT: u8 = 0x04;
const MASK_BG: u8 = 0x08;
const MASK_SPRITES: u8 = 0x10;

/// One sprite selected for the scanline, pattern bytes already fetched and flipped.
#[derive(Clone, Copy, Default)]
struct SpriteSlot {
    x: u8,
    attr: u8,
    lo: u8,
    hi: u8,
    is_sprite_zero: bool,
}

/// PPU state: timing, loopy registers, VRAM, palettes, OAM, and framebuffer.
pub struct PPU {
    /// Dot within the scanline, 0..=340.
    pub cycle: u16,
    /// 0..=239 visible, 240 post-render, 241..=260 vblank, 261 pre-render.
    pub scanline: u16,
    /// Completed frame count; its parity drives the odd-frame dot skip.
    pub frame: u64,
    nmi: bool,
    pub vblank: bool,
    pub sprite_0_hit: bool,
    pub sprite_overflow: bool,
    pub ctrl: u8,
    pub mask: u8,

    /// Current VRAM address (15 bits): fine Y, nametable select, coarse Y, coarse X.
    pub v: u16,
    /// Temporary VRAM address; top-left of the screen between frames.
    pub t: u16,
    pub fine_x: u8,
    /// First/second write toggle shared by $2005 and $2006.
    pub w: bool,
    /// $2007 read buffer: non-palette reads return the previous fetch.
    read_buffer: u8,
    /// Last value driven on the PPU data bus; returned by reads of write-only registers.
    io_latch: u8,

    /// Nametable RAM. 2 KiB on the console; the upper half backs four-screen carts.
    pub vram: [u8; 0x1000],
    /// Palette RAM $3F00-$3F1F (32 bytes, with NES mirroring).
    pub palette: [u8; 32],
    /// OAM: 64 sprites × 4 bytes (Y, tile, attr, X). Written via $2003/$2004 or $4014 DMA.
    pub oam: [u8; OAM_LEN],
    /// OAM address for $2003/$2004 (byte index 0..255).
    pub oam_addr: u8,

    bg_next_tile: u8,
    bg_next_attr: u8,
    bg_next_lo: u8,
    bg_next_hi: u8,
    bg_shift_lo: u16,
    bg_shift_hi: u16,
    attr_shift_lo: u16,
    attr_shift_hi: u16,

    sprites: [SpriteSlot; 8],
    sprite_count: usize,

    /// Palette indices of the scanline being drawn, committed at the end of the line.
    line: [u8; WIDTH],
    /// 256×240 RGB framebuffer, 3 bytes per pixel, row-major.
    pub framebuffer: Vec<u8>,
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}

impl PPU {
    /// Create PPU in initial state (pre-render scanline, dot 0).
    pub fn new() -> Self {
        Self {
            cycle: 0,
            scanline: PRERENDER_SCANLINE,
            frame: 0,
            nmi: false,
            vblank: false,
            sprite_0_hit: false,
            sprite_overflow: false,
            ctrl: 0,
            mask: 0,
            v: 0,
            t: 0,
            fine_x: 0,
            w: false,
            read_buffer: 0,
            io_latch: 0,
            vram: [0; 0x1000],
            palette: [0; 32],
            oam: [0; OAM_LEN],
            oam_addr: 0,
            bg_next_tile: 0,
            bg_next_attr: 0,
            bg_next_lo: 0,
            bg_next_hi: 0,
            bg_shift_lo: 0,
            bg_shift_hi: 0,
            attr_shift_lo: 0,
            attr_shift_hi: 0,
            sprites: [SpriteSlot::default(); 8],
            sprite_count: 0,
            line: [0; WIDTH],
            framebuffer: vec![0; WIDTH * HEIGHT * 3],
        }
    }

    /// Finished frame: `WIDTH * HEIGHT * 3` bytes of RGB.
    pub fn frame_buffer(&self) -> &[u8] {
        &self.framebuffer
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask & (MASK_BG | MASK_SPRITES) != 0
    }

    /// Consume a pending vblank NMI.
    pub fn poll_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }

    /// Advance by `cpu_cycles` CPU cycles (three dots each). Returns true if a frame completed.
    pub fn tick(&mut self, cart: &mut Cartridge, cpu_cycles: usize) -> bool {
        let mut frame_done = false;
        for _ in 0..cpu_cycles * 3 {
            frame_done |= self.step(cart);
        }
        frame_done
    }

    /// Advance one dot. Returns true when the pre-render line wraps to scanline 0.
    pub fn step(&mut self, cart: &mut Cartridge) -> bool {
        let dot = self.cycle;
        let line = self.scanline;
        let visible = line < HEIGHT as u16;
        let prerender = line == PRERENDER_SCANLINE;
        let rendering = self.rendering_enabled();

        if prerender && dot == 1 {
            self.vblank = false;
            self.sprite_0_hit = false;
            self.sprite_overflow = false;
        }

        if (visible || prerender) && rendering {
            self.render_dot(cart, dot, visible, prerender);
        }

        if visible && (1..=256).contains(&dot) {
            let x = (dot - 1) as usize;
            self.line[x] = if rendering {
                self.compose_pixel(x)
            } else {
                self.palette[0]
            };
        }

        if (visible || prerender) && dot == 260 {
            cart.scanline_irq(line, rendering);
        }

        if line == VBLANK_SCANLINE && dot == 1 {
            self.vblank = true;
            if self.ctrl & CTRL_NMI != 0 {
                self.nmi = true;
            }
        }

        // Odd frames drop the last pre-render dot while rendering.
        if prerender && dot == 339 && rendering && self.frame % 2 == 1 {
            self.cycle = DOTS_PER_SCANLINE;
        } else {
            self.cycle += 1;
        }

        if self.cycle >= DOTS_PER_SCANLINE {
            if visible {
                self.commit_line(line as usize);
            }
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.frame += 1;
                return true;
            }
        }
        false
    }

    /// Background fetch pipeline, scroll updates, and sprite evaluation for one dot.
    fn render_dot(&mut self, cart: &mut Cartridge, dot: u16, visible: bool, prerender: bool) {
        if (2..=257).contains(&dot) || (322..=337).contains(&dot) {
            self.shift_background();
        }

        if (1..=256).contains(&dot) || (321..=336).contains(&dot) {
            match (dot - 1) % 8 {
                0 => {
                    self.load_background_shifters();
                    self.bg_next_tile = self.read_vram(cart, 0x2000 | (self.v & 0x0FFF));
                }
                2 => {
                    let v = self.v;
                    let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
                    let mut attr = self.read_vram(cart, addr);
                    if v & 0x40 != 0 {
                        attr >>= 4;
                    }
                    if v & 0x02 != 0 {
                        attr >>= 2;
                    }
                    self.bg_next_attr = attr & 0x03;
                }
                4 => self.bg_next_lo = cart.read_chr(self.bg_pattern_addr()),
                6 => self.bg_next_hi = cart.read_chr(self.bg_pattern_addr() + 8),
                7 => self.increment_x(),
                _ => {}
            }
        }

        if dot == 256 {
            self.increment_y();
        }
        if dot == 257 {
            self.copy_horizontal();
            if visible {
                self.evaluate_sprites(cart);
            } else {
                self.sprite_count = 0;
            }
        }
        if prerender && (280..=304).contains(&dot) {
            self.copy_vertical();
        }
    }

    fn bg_pattern_addr(&self) -> u16 {
        let table = if self.ctrl & CTRL_BG_TABLE != 0 {
            0x1000
        } else {
            0x0000
        };
        let fine_y = (self.v >> 12) & 0x07;
        table + (self.bg_next_tile as u16) * 16 + fine_y
    }

    fn load_background_shifters(&mut self) {
        self.bg_shift_lo = (self.bg_shift_lo & 0xFF00) | self.bg_next_lo as u16;
        self.bg_shift_hi = (self.bg_shift_hi & 0xFF00) | self.bg_next_hi as u16;
        let lo = if self.bg_next_attr & 1 != 0 { 0xFF } else { 0x00 };
        let hi = if self.bg_next_attr & 2 != 0 { 0xFF } else { 0x00 };
        self.attr_shift_lo = (self.attr_shift_lo & 0xFF00) | lo;
        self.attr_shift_hi = (self.attr_shift_hi & 0xFF00) | hi;
    }

    fn shift_background(&mut self) {
        self.bg_shift_lo <<= 1;
        self.bg_shift_hi <<= 1;
        self.attr_shift_lo <<= 1;
        self.attr_shift_hi <<= 1;
    }

    /// Coarse X increment, wrapping into the horizontally adjacent nametable.
    fn increment_x(&mut self) {
        if self.v & 0x001F == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400;
        } else {
            self.v += 1;
        }
    }

    /// Fine Y increment with carry into coarse Y; row 29 wraps into the vertically adjacent
    /// nametable, rows 30/31 (attribute memory) wrap without switching.
    fn increment_y(&mut self) {
        if self.v & 0x7000 != 0x7000 {
            self.v += 0x1000;
            return;
        }
        self.v &= !0x7000;
        let mut coarse_y = (self.v & 0x03E0) >> 5;
        if coarse_y == 29 {
            coarse_y = 0;
            self.v ^= 0x0800;
        } else if coarse_y == 31 {
            coarse_y = 0;
        } else {
            coarse_y += 1;
        }
        self.v = (self.v & !0x03E0) | (coarse_y << 5);
    }

    fn copy_horizontal(&mut self) {
        self.v = (self.v & !0x041F) | (self.t & 0x041F);
    }

    fn copy_vertical(&mut self) {
        self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
    }

    /// Select up to 8 sprites covering the current scanline (they are drawn on the next one,
    /// since OAM Y is one less than the sprite's top row). Lower OAM index = higher priority.
    fn evaluate_sprites(&mut self, cart: &mut Cartridge) {
        let row = self.scanline;
        let height: u16 = if self.ctrl & CTRL_SPRITE_16 != 0 { 16 } else { 8 };
        let table = if self.ctrl & CTRL_SPRITE_TABLE != 0 {
            0x1000u16
        } else {
            0x0000
        };

        self.sprite_count = 0;
        for i in 0..64usize {
            let base = i * 4;
            let y = self.oam[base] as u16;
            if row < y || row >= y + height {
                continue;
            }
            if self.sprite_count == 8 {
                self.sprite_overflow = true;
                break;
            }

            let tile = self.oam[base + 1];
            let attr = self.oam[base + 2];
            let flip_v = attr & 0x80 != 0;
            let flip_h = attr & 0x40 != 0;

            let mut y_offset = row - y;
            if flip_v {
                y_offset = height - 1 - y_offset;
            }
            let addr = if height == 8 {
                table + tile as u16 * 16 + y_offset
            } else {
                let table = (tile & 1) as u16 * 0x1000;
                let top = (tile & 0xFE) as u16;
                let (tile, y_offset) = if y_offset < 8 {
                    (top, y_offset)
                } else {
                    (top + 1, y_offset - 8)
                };
                table + tile * 16 + y_offset
            };

            let mut lo = cart.read_chr(addr);
            let mut hi = cart.read_chr(addr + 8);
            if flip_h {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }

            self.sprites[self.sprite_count] = SpriteSlot {
                x: self.oam[base + 3],
                attr,
                lo,
                hi,
                is_sprite_zero: i == 0,
            };
            self.sprite_count += 1;
        }
    }

    /// Resolve the background/sprite pixel at `x` to a palette entry; sets sprite-0 hit on the
    /// exact dot where an opaque sprite-0 pixel overlaps an opaque background pixel.
    fn compose_pixel(&mut self, x: usize) -> u8 {
        let mut bg_pixel = 0u8;
        let mut bg_palette = 0u8;
        if self.mask & MASK_BG != 0 && (x >= 8 || self.mask & MASK_BG_LEFT != 0) {
            let mux = 0x8000u16 >> self.fine_x;
            let p0 = (self.bg_shift_lo & mux != 0) as u8;
            let p1 = (self.bg_shift_hi & mux != 0) as u8;
            bg_pixel = (p1 << 1) | p0;
            let a0 = (self.attr_shift_lo & mux != 0) as u8;
            let a1 = (self.attr_shift_hi & mux != 0) as u8;
            bg_palette = (a1 << 1) | a0;
        }

        let mut sprite_pixel = 0u8;
        let mut sprite_palette = 0u8;
        let mut behind_bg = false;
        let mut sprite_zero = false;
        if self.mask & MASK_SPRITES != 0 && (x >= 8 || self.mask & MASK_SPRITE_LEFT != 0) {
            for slot in &self.sprites[..self.sprite_count] {
                let col = x as i16 - slot.x as i16;
                if !(0..8).contains(&col) {
                    continue;
                }
                let bit = 7 - col;
                let pixel = (((slot.hi >> bit) & 1) << 1) | ((slot.lo >> bit) & 1);
                if pixel == 0 {
                    continue;
                }
                sprite_pixel = pixel;
                sprite_palette = (slot.attr & 0x03) + 4;
                behind_bg = slot.attr & 0x20 != 0;
                sprite_zero = slot.is_sprite_zero;
                break;
            }
        }

        if sprite_zero && bg_pixel != 0 && sprite_pixel != 0 && x != 255 {
            self.sprite_0_hit = true;
        }

        let (palette, pixel) = match (bg_pixel, sprite_pixel) {
            (0, 0) => (0, 0),
            (0, _) => (sprite_palette, sprite_pixel),
            (_, 0) => (bg_palette, bg_pixel),
            _ if behind_bg => (bg_palette, bg_pixel),
            _ => (sprite_palette, sprite_pixel),
        };
        let addr = 0x3F00 + ((palette as u16) << 2) + pixel as u16;
        self.palette[Self::palette_index(addr)]
    }

    fn commit_line(&mut self, y: usize) {
        let grey = if self.mask & MASK_GREYSCALE != 0 {
            0x30
        } else {
            0x3F
        };
        let row = &mut self.framebuffer[y * WIDTH * 3..(y + 1) * WIDTH * 3];
        for (px, &color) in row.chunks_exact_mut(3).zip(self.line.iter()) {
            let rgb = NES_PALETTE_RGB[(color & grey) as usize];
            px[0] = (rgb >> 16) as u8;
            px[1] = (rgb >> 8) as u8;
            px[2] = rgb as u8;
        }
    }

    /// Resolve PPU palette address $3F00–$3F1F (and $3F20–$3FFF mirrors) to 32-byte index.
    /// Addresses $3F10, $3F14, $3F18, $3F1C mirror $3F00, $3F04, $3F08, $3F0C.
    pub fn palette_index(addr: u16) -> usize {
        let i = (addr & 0x1F) as usize;
        if i >= 16 && i % 4 == 0 { i - 16 } else { i }
    }

    /// Map PPU nametable VRAM address ($2000–$3EFF) to a VRAM index using mirroring.
    pub fn map_nametable_addr(addr: u16, mirroring: Mirroring) -> usize {
        let addr = (addr - 0x2000) & 0x0FFF;
        let table = addr / 0x400;
        let offset = addr & 0x3FF;

        let physical = match mirroring {
            Mirroring::Vertical => table & 1,
            Mirroring::Horizontal => table >> 1,
            Mirroring::FourScreen => table,
            Mirroring::OneScreenLower => 0,
            Mirroring::OneScreenUpper => 1,
        };
        (physical * 0x400 + offset) as usize
    }

    fn read_vram(&self, cart: &Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.read_chr(addr),
            0x2000..=0x3EFF => self.vram[Self::map_nametable_addr(addr, cart.mirroring())],
            _ => self.palette[Self::palette_index(addr)],
        }
    }

    fn write_vram(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.write_chr(addr, data),
            0x2000..=0x3EFF => {
                let index = Self::map_nametable_addr(addr, cart.mirroring());
                self.vram[index] = data;
            }
            // Upper 2 bits of palette entries don't exist.
            _ => self.palette[Self::palette_index(addr)] = data & 0x3F,
        }
    }

    fn increment_vram_addr(&mut self) {
        let inc = if self.ctrl & CTRL_INCREMENT_32 != 0 {
            32
        } else {
            1
        };
        self.v = self.v.wrapping_add(inc) & 0x7FFF;
    }

    /// CPU read of $2000–$2007 (`addr` already folded to that range).
    pub fn read_register(&mut self, cart: &mut Cartridge, addr: u16) -> u8 {
        let value = match addr & 0x0007 {
            // PPUSTATUS: low 5 bits are stale bus contents. Reading clears vblank and the toggle.
            2 => {
                let mut status = self.io_latch & 0x1F;
                if self.vblank {
                    status |= 0x80;
                }
                if self.sprite_0_hit {
                    status |= 0x40;
                }
                if self.sprite_overflow {
                    status |= 0x20;
                }
                self.vblank = false;
                self.w = false;
                status
            }
            4 => self.oam[self.oam_addr as usize],
            7 => {
                let addr = self.v & 0x3FFF;
                let data = if addr >= 0x3F00 {
                    // Palette reads bypass the buffer; the buffer gets the nametable underneath.
                    self.read_buffer = self.read_vram(cart, addr - 0x1000);
                    self.read_vram(cart, addr)
                } else {
                    let buffered = self.read_buffer;
                    self.read_buffer = self.read_vram(cart, addr);
                    buffered
                };
                self.increment_vram_addr();
                data
            }
            _ => self.io_latch,
        };
        self.io_latch = value;
        value
    }

    /// CPU write of $2000–$2007 (`addr` already folded to that range).
    pub fn write_register(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        self.io_latch = data;
        match addr & 0x0007 {
            0 => {
                let was_enabled = self.ctrl & CTRL_NMI != 0;
                self.ctrl = data;
                self.t = (self.t & !0x0C00) | (((data & CTRL_NAMETABLE) as u16) << 10);
                // Enabling NMI during vblank fires immediately.
                if !was_enabled && data & CTRL_NMI != 0 && self.vblank {
                    self.nmi = true;
                }
            }
            1 => self.mask = data,
            3 => self.oam_addr = data,
            4 => {
                self.oam[self.oam_addr as usize] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => {
                if !self.w {
                    self.t = (self.t & !0x001F) | (data >> 3) as u16;
                    self.fine_x = data & 0x07;
                } else {
                    self.t = (self.t & !0x73E0)
                        | (((data & 0x07) as u16) << 12)
                        | (((data & 0xF8) as u16) << 2);
                }
                self.w = !self.w;
            }
            6 => {
                if !self.w {
                    self.t = (self.t & 0x00FF) | (((data & 0x3F) as u16) << 8);
                } else {
                    self.t = (self.t & 0xFF00) | data as u16;
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            7 => {
                self.write_vram(cart, self.v, data);
                self.increment_vram_addr();
            }
            _ => {}
        }
    }

    /// Copy 256 bytes into OAM starting at OAMADDR (OAM DMA from $4014).
    pub fn oam_dma(&mut self, page: &[u8; OAM_LEN]) {
        for &byte in page {
            self.oam[self.oam_addr as usize] = byte;
            self.oam_addr = self.oam_addr.wrapping_add(1);
        }
    }
}
