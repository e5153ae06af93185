use crate::{
    cartridge::{cartridge::Cartridge, mapper::Mirroring},
    ppu::ppu::{NES_PALETTE_RGB, PPU},
};

/// 16 KiB NROM with 8 KiB CHR RAM, so tests can upload patterns through PPUDATA.
fn chr_ram_cart(flags6: u8) -> Cartridge {
    let mut rom = vec![b'N', b'E', b'S', 0x1A, 1, 0, flags6, 0];
    rom.resize(16 + 16 * 1024, 0);
    Cartridge::from_bytes(&rom, None).unwrap()
}

fn set_addr(ppu: &mut PPU, cart: &mut Cartridge, addr: u16) {
    ppu.write_register(cart, 6, (addr >> 8) as u8);
    ppu.write_register(cart, 6, addr as u8);
}

fn write_vram(ppu: &mut PPU, cart: &mut Cartridge, addr: u16, data: &[u8]) {
    set_addr(ppu, cart, addr);
    for &byte in data {
        ppu.write_register(cart, 7, byte);
    }
}

/// Step dots, returning how many times a frame completed.
fn run_dots(ppu: &mut PPU, cart: &mut Cartridge, dots: usize) -> usize {
    (0..dots).filter(|_| ppu.step(cart)).count()
}

#[test]
fn scanline_advances_after_341_dots() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.scanline = 0;
    ppu.cycle = 0;
    run_dots(&mut ppu, &mut cart, 340);
    assert_eq!((ppu.scanline, ppu.cycle), (0, 340));
    run_dots(&mut ppu, &mut cart, 1);
    assert_eq!((ppu.scanline, ppu.cycle), (1, 0));
}

#[test]
fn frame_completes_once_per_262_scanlines() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.scanline = 0;
    let frame = 262 * 341;
    assert_eq!(run_dots(&mut ppu, &mut cart, frame - 1), 0);
    assert_eq!(run_dots(&mut ppu, &mut cart, 1), 1);
    assert_eq!((ppu.scanline, ppu.cycle), (0, 0));
    assert_eq!(run_dots(&mut ppu, &mut cart, frame * 3), 3);
    assert_eq!(ppu.frame, 4);
}

#[test]
fn odd_frames_skip_a_dot_while_rendering() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.write_register(&mut cart, 1, 0x08);

    // Pre-render line of frame 0 (even): full length.
    let mut dots = 0;
    while !ppu.step(&mut cart) {
        dots += 1;
    }
    assert_eq!(dots + 1, 341);

    // Frame 1 is odd: one dot shorter.
    dots = 0;
    while !ppu.step(&mut cart) {
        dots += 1;
    }
    assert_eq!(dots + 1, 262 * 341 - 1);
}

#[test]
fn vblank_and_nmi_at_scanline_241() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.write_register(&mut cart, 0, 0x80);
    ppu.scanline = 241;
    ppu.cycle = 0;
    ppu.step(&mut cart);
    assert!(!ppu.vblank);
    ppu.step(&mut cart);
    assert!(ppu.vblank);
    assert!(ppu.poll_nmi());
    assert!(!ppu.poll_nmi());
}

#[test]
fn no_nmi_when_disabled() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.scanline = 241;
    run_dots(&mut ppu, &mut cart, 2);
    assert!(ppu.vblank);
    assert!(!ppu.poll_nmi());
}

#[test]
fn enabling_nmi_during_vblank_fires() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.vblank = true;
    ppu.write_register(&mut cart, 0, 0x80);
    assert!(ppu.poll_nmi());
}

#[test]
fn prerender_line_clears_status_flags() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.vblank = true;
    ppu.sprite_0_hit = true;
    ppu.sprite_overflow = true;
    run_dots(&mut ppu, &mut cart, 2);
    assert!(!ppu.vblank && !ppu.sprite_0_hit && !ppu.sprite_overflow);
}

#[test]
fn status_read_clears_vblank_and_write_toggle() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.vblank = true;
    ppu.write_register(&mut cart, 5, 0x10);
    assert!(ppu.w);

    assert_ne!(ppu.read_register(&mut cart, 2) & 0x80, 0);
    assert!(!ppu.vblank);
    assert!(!ppu.w);
    assert_eq!(ppu.read_register(&mut cart, 2) & 0x80, 0);
}

#[test]
fn write_only_registers_read_back_the_bus_latch() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.write_register(&mut cart, 1, 0xA5);
    assert_eq!(ppu.read_register(&mut cart, 0), 0xA5);
    assert_eq!(ppu.read_register(&mut cart, 2), 0x05);
}

#[test]
fn scroll_and_address_writes_fill_loopy_registers() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.write_register(&mut cart, 0, 0x00);
    ppu.read_register(&mut cart, 2);
    ppu.write_register(&mut cart, 5, 0x7D);
    assert_eq!(ppu.t & 0x001F, 0x0F);
    assert_eq!(ppu.fine_x, 5);
    ppu.write_register(&mut cart, 5, 0x5E);
    assert_eq!(ppu.t, 0x616F);

    ppu.write_register(&mut cart, 6, 0x3D);
    assert_eq!(ppu.t, 0x3D6F);
    ppu.write_register(&mut cart, 6, 0xF0);
    assert_eq!(ppu.t, 0x3DF0);
    assert_eq!(ppu.v, 0x3DF0);

    ppu.write_register(&mut cart, 0, 0x03);
    assert_eq!(ppu.t & 0x0C00, 0x0C00);
}

#[test]
fn ppudata_reads_are_buffered_except_palette() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    write_vram(&mut ppu, &mut cart, 0x2000, &[0xAA, 0xBB]);
    write_vram(&mut ppu, &mut cart, 0x3F01, &[0x12]);

    set_addr(&mut ppu, &mut cart, 0x2000);
    ppu.read_register(&mut cart, 7); // stale buffer
    assert_eq!(ppu.read_register(&mut cart, 7), 0xAA);
    assert_eq!(ppu.read_register(&mut cart, 7), 0xBB);

    set_addr(&mut ppu, &mut cart, 0x3F01);
    assert_eq!(ppu.read_register(&mut cart, 7), 0x12);
}

#[test]
fn ppudata_increment_follows_ctrl() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    write_vram(&mut ppu, &mut cart, 0x2000, &[1, 2]);
    assert_eq!(ppu.v, 0x2002);

    ppu.write_register(&mut cart, 0, 0x04);
    write_vram(&mut ppu, &mut cart, 0x2000, &[3, 4]);
    assert_eq!(ppu.v, 0x2040);
    assert_eq!(ppu.vram[0], 3);
    assert_eq!(ppu.vram[1], 2);
    assert_eq!(ppu.vram[32], 4);
}

#[test]
fn chr_ram_is_writable_through_ppudata() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    write_vram(&mut ppu, &mut cart, 0x0010, &[0x3C]);
    assert_eq!(cart.read_chr(0x0010), 0x3C);
}

#[test]
fn palette_entries_mirror() {
    assert_eq!(PPU::palette_index(0x3F10), 0x00);
    assert_eq!(PPU::palette_index(0x3F14), 0x04);
    assert_eq!(PPU::palette_index(0x3F18), 0x08);
    assert_eq!(PPU::palette_index(0x3F1C), 0x0C);
    assert_eq!(PPU::palette_index(0x3F11), 0x11);
    assert_eq!(PPU::palette_index(0x3F20), 0x00);
    assert_eq!(PPU::palette_index(0x3FFF), 0x1F);

    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    write_vram(&mut ppu, &mut cart, 0x3F10, &[0x2A]);
    assert_eq!(ppu.palette[0], 0x2A);
}

#[test]
fn nametable_mirroring_modes() {
    use Mirroring::*;
    let map = PPU::map_nametable_addr;

    assert_eq!(map(0x2000, Vertical), map(0x2800, Vertical));
    assert_eq!(map(0x2400, Vertical), 0x400);
    assert_eq!(map(0x2C05, Vertical), 0x405);

    assert_eq!(map(0x2000, Horizontal), map(0x2400, Horizontal));
    assert_eq!(map(0x2800, Horizontal), 0x400);
    assert_eq!(map(0x2C05, Horizontal), 0x405);

    assert_eq!(map(0x2C00, FourScreen), 0xC00);
    assert_eq!(map(0x2C00, OneScreenLower), 0x000);
    assert_eq!(map(0x2000, OneScreenUpper), 0x400);

    // $3000-$3EFF mirrors $2000-$2EFF.
    assert_eq!(map(0x3400, Vertical), map(0x2400, Vertical));
}

#[test]
fn oam_dma_starts_at_oam_addr() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.write_register(&mut cart, 3, 0xFE);
    let page: [u8; 256] = std::array::from_fn(|i| i as u8);
    ppu.oam_dma(&page);
    assert_eq!(ppu.oam[0xFE], 0);
    assert_eq!(ppu.oam[0xFF], 1);
    assert_eq!(ppu.oam[0x00], 2);
    assert_eq!(ppu.oam_addr, 0xFE);
}

#[test]
fn more_than_eight_sprites_sets_overflow() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.oam.fill(0xFF);
    for i in 0..9 {
        ppu.oam[i * 4] = 5;
    }
    ppu.write_register(&mut cart, 1, 0x18);
    ppu.scanline = 10;
    ppu.cycle = 0;
    run_dots(&mut ppu, &mut cart, 257);
    assert!(!ppu.sprite_overflow);
    run_dots(&mut ppu, &mut cart, 1);
    assert!(ppu.sprite_overflow);
}

#[test]
fn eight_sprites_do_not_overflow() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.oam.fill(0xFF);
    for i in 0..8 {
        ppu.oam[i * 4] = 5;
    }
    ppu.write_register(&mut cart, 1, 0x18);
    ppu.scanline = 10;
    run_dots(&mut ppu, &mut cart, 341);
    assert!(!ppu.sprite_overflow);
}

/// Every background tile and sprite 0 use tile 1, a solid block of color 1.
fn solid_scene(ppu: &mut PPU, cart: &mut Cartridge, sprite_x: u8, mask: u8) {
    write_vram(ppu, cart, 0x0010, &[0xFF; 8]);
    write_vram(ppu, cart, 0x2000, &[1; 960]);
    set_addr(ppu, cart, 0x0000);
    ppu.oam.fill(0xFF);
    ppu.oam[..4].copy_from_slice(&[29, 1, 0, sprite_x]);
    ppu.write_register(cart, 1, mask);
}

#[test]
fn sprite_zero_hit_on_exact_pixel() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    solid_scene(&mut ppu, &mut cart, 100, 0x1E);

    let mut guard = 0;
    while !ppu.sprite_0_hit {
        ppu.step(&mut cart);
        guard += 1;
        assert!(guard < 2 * 262 * 341, "sprite 0 never hit");
    }
    // Hit lands on the overlapping pixel itself, with no extra scanline offset.
    // OAM Y 29 puts the sprite's top row on scanline 30; x = 100 is dot 101.
    assert_eq!(ppu.scanline, 30);
    assert_eq!(ppu.cycle, 102);
}

#[test]
fn sprite_zero_hit_respects_left_clipping() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    solid_scene(&mut ppu, &mut cart, 0, 0x18);
    run_dots(&mut ppu, &mut cart, 2 * 262 * 341);
    assert!(!ppu.sprite_0_hit);
}

#[test]
fn backdrop_fills_frame_when_rendering_disabled() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    write_vram(&mut ppu, &mut cart, 0x3F00, &[0x21]);
    ppu.scanline = 0;
    ppu.cycle = 0;
    assert_eq!(run_dots(&mut ppu, &mut cart, 262 * 341), 1);

    let rgb = NES_PALETTE_RGB[0x21];
    let expected = [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8];
    let frame = ppu.frame_buffer();
    assert_eq!(frame.len(), 256 * 240 * 3);
    assert_eq!(&frame[..3], &expected);
    assert_eq!(&frame[frame.len() - 3..], &expected);
}

#[test]
fn background_pixels_reach_the_framebuffer() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    solid_scene(&mut ppu, &mut cart, 0, 0x0A);
    ppu.oam.fill(0xFF);
    write_vram(&mut ppu, &mut cart, 0x3F00, &[0x0F, 0x16]);
    set_addr(&mut ppu, &mut cart, 0x0000);

    // Pre-render line plus one full frame.
    run_dots(&mut ppu, &mut cart, 341 + 262 * 341);

    let rgb = NES_PALETTE_RGB[0x16];
    let expected = [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8];
    let frame = ppu.frame_buffer();
    let middle = (120 * 256 + 128) * 3;
    assert_eq!(&frame[middle..middle + 3], &expected);
}

/// Put the PPU on `line`/`dot` with rendering on and `v` preset, then run that one dot.
fn run_scroll_dot(line: u16, dot: u16, v: u16, t: u16) -> u16 {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    ppu.write_register(&mut cart, 1, 0x08);
    ppu.oam.fill(0xFF);
    ppu.scanline = line;
    ppu.cycle = dot;
    ppu.v = v;
    ppu.t = t;
    ppu.step(&mut cart);
    ppu.v
}

const FINE_Y: u16 = 0x7000;
const COARSE_Y: u16 = 0x03E0;
const NAMETABLE_Y: u16 = 0x0800;

#[test]
fn dot_256_increments_fine_y() {
    let v = run_scroll_dot(5, 256, 3 << 12 | 7 << 5, 0);
    assert_eq!(v & FINE_Y, 4 << 12);
    assert_eq!(v & COARSE_Y, 7 << 5);
}

#[test]
fn fine_y_carries_into_coarse_y() {
    let v = run_scroll_dot(5, 256, FINE_Y | 7 << 5, 0);
    assert_eq!(v & FINE_Y, 0);
    assert_eq!(v & COARSE_Y, 8 << 5);
    assert_eq!(v & NAMETABLE_Y, 0);
}

#[test]
fn coarse_y_29_wraps_and_switches_nametable() {
    let v = run_scroll_dot(5, 256, FINE_Y | 29 << 5, 0);
    assert_eq!(v & (FINE_Y | COARSE_Y), 0);
    assert_eq!(v & NAMETABLE_Y, NAMETABLE_Y);

    let v = run_scroll_dot(5, 256, FINE_Y | 29 << 5 | NAMETABLE_Y, 0);
    assert_eq!(v & NAMETABLE_Y, 0);
}

#[test]
fn attribute_rows_wrap_without_switching_nametable() {
    let v = run_scroll_dot(5, 256, FINE_Y | 30 << 5, 0);
    assert_eq!(v & COARSE_Y, 31 << 5);
    assert_eq!(v & NAMETABLE_Y, 0);

    let v = run_scroll_dot(5, 256, FINE_Y | 31 << 5 | NAMETABLE_Y, 0);
    assert_eq!(v & COARSE_Y, 0);
    assert_eq!(v & NAMETABLE_Y, NAMETABLE_Y);
}

#[test]
fn dot_257_copies_horizontal_bits() {
    let v = run_scroll_dot(5, 257, 0x7BE0, 0x041F);
    assert_eq!(v, 0x7FFF);
    // Vertical bits of t stay out of v.
    let v = run_scroll_dot(5, 257, 0x0000, 0x7BE0);
    assert_eq!(v, 0x0000);
}

#[test]
fn prerender_copies_vertical_bits_on_dots_280_to_304() {
    assert_eq!(run_scroll_dot(261, 280, 0x041F, 0x7BE0), 0x7FFF);
    assert_eq!(run_scroll_dot(261, 304, 0x041F, 0x7BE0), 0x7FFF);
    assert_eq!(run_scroll_dot(261, 279, 0x041F, 0x7BE0), 0x041F);
    assert_eq!(run_scroll_dot(261, 305, 0x041F, 0x7BE0), 0x041F);
    // Visible lines never copy vertical bits.
    assert_eq!(run_scroll_dot(100, 280, 0x041F, 0x7BE0), 0x041F);
}

fn rgb(index: u8) -> [u8; 3] {
    let rgb = NES_PALETTE_RGB[index as usize];
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
}

fn pixel(ppu: &PPU, x: usize, y: usize) -> [u8; 3] {
    let i = (y * 256 + x) * 3;
    let frame = ppu.frame_buffer();
    [frame[i], frame[i + 1], frame[i + 2]]
}

const BACKDROP: u8 = 0x0F;
const BG_COLOR: u8 = 0x16;
const SPRITE_COLOR_1: u8 = 0x2A;
const SPRITE_COLOR_2: u8 = 0x12;
const SPRITE_PALETTE_1: u8 = 0x30;

/// Patterns in the low table: 1 = solid color 1, 2 = left column, 3 = top row,
/// 4 = solid color 2, 5 = solid color 1. The high table swaps 4 and 5.
/// Tile 0 stays transparent, so the background is empty unless a test places tile 1.
fn sprite_scene(ppu: &mut PPU, cart: &mut Cartridge) {
    write_vram(ppu, cart, 0x0010, &[0xFF; 8]);
    write_vram(ppu, cart, 0x0020, &[0x80; 8]);
    write_vram(ppu, cart, 0x0030, &[0xFF]);
    write_vram(ppu, cart, 0x0048, &[0xFF; 8]);
    write_vram(ppu, cart, 0x0050, &[0xFF; 8]);
    write_vram(ppu, cart, 0x1040, &[0xFF; 8]);
    write_vram(ppu, cart, 0x1058, &[0xFF; 8]);

    write_vram(ppu, cart, 0x3F00, &[BACKDROP, BG_COLOR]);
    write_vram(ppu, cart, 0x3F11, &[SPRITE_COLOR_1, SPRITE_COLOR_2]);
    write_vram(ppu, cart, 0x3F15, &[SPRITE_PALETTE_1]);
    ppu.oam.fill(0xFF);
}

/// OAM entry `index`: top row on scanline `top`.
fn place_sprite(ppu: &mut PPU, index: usize, top: u8, tile: u8, attr: u8, x: u8) {
    ppu.oam[index * 4..index * 4 + 4].copy_from_slice(&[top - 1, tile, attr, x]);
}

/// Enable rendering (both layers, no clipping) and draw one complete frame.
fn render_frame(ppu: &mut PPU, cart: &mut Cartridge, ctrl: u8) {
    set_addr(ppu, cart, 0x0000);
    ppu.write_register(cart, 0, ctrl);
    ppu.write_register(cart, 1, 0x1E);
    run_dots(ppu, cart, 341 + 262 * 341);
}

#[test]
fn behind_background_sprites_show_only_through_transparent_background() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    sprite_scene(&mut ppu, &mut cart);
    // Opaque background tiles at row 5, columns 10 and 12 (x 80..88 and 96..104, y 40..48).
    write_vram(&mut ppu, &mut cart, 0x2000 + 5 * 32 + 10, &[1, 0, 1]);
    place_sprite(&mut ppu, 0, 40, 1, 0x20, 80);
    place_sprite(&mut ppu, 1, 40, 1, 0x20, 160);
    place_sprite(&mut ppu, 2, 40, 1, 0x00, 96);
    render_frame(&mut ppu, &mut cart, 0);

    assert_eq!(pixel(&ppu, 83, 43), rgb(BG_COLOR));
    assert_eq!(pixel(&ppu, 163, 43), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 99, 43), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 120, 43), rgb(BACKDROP));
}

#[test]
fn lower_oam_index_wins_overlaps() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    sprite_scene(&mut ppu, &mut cart);
    // Sprite 0 is only opaque in its left column; sprite 1 is solid in palette 1.
    place_sprite(&mut ppu, 0, 60, 2, 0x00, 50);
    place_sprite(&mut ppu, 1, 60, 1, 0x01, 50);
    // Same order with the higher index fully opaque underneath.
    place_sprite(&mut ppu, 2, 60, 1, 0x00, 100);
    place_sprite(&mut ppu, 3, 60, 1, 0x01, 104);
    render_frame(&mut ppu, &mut cart, 0);

    assert_eq!(pixel(&ppu, 50, 62), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 51, 62), rgb(SPRITE_PALETTE_1));
    assert_eq!(pixel(&ppu, 105, 62), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 109, 62), rgb(SPRITE_PALETTE_1));
}

#[test]
fn sprites_flip_horizontally_and_vertically() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    sprite_scene(&mut ppu, &mut cart);
    place_sprite(&mut ppu, 0, 100, 2, 0x00, 140);
    place_sprite(&mut ppu, 1, 100, 2, 0x40, 120);
    place_sprite(&mut ppu, 2, 100, 3, 0x00, 200);
    place_sprite(&mut ppu, 3, 100, 3, 0x80, 180);
    render_frame(&mut ppu, &mut cart, 0);

    assert_eq!(pixel(&ppu, 140, 103), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 147, 103), rgb(BACKDROP));
    assert_eq!(pixel(&ppu, 120, 103), rgb(BACKDROP));
    assert_eq!(pixel(&ppu, 127, 103), rgb(SPRITE_COLOR_1));

    assert_eq!(pixel(&ppu, 203, 100), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 203, 107), rgb(BACKDROP));
    assert_eq!(pixel(&ppu, 183, 100), rgb(BACKDROP));
    assert_eq!(pixel(&ppu, 183, 107), rgb(SPRITE_COLOR_1));
}

#[test]
fn tall_sprites_pick_table_from_tile_bit_0() {
    let mut cart = chr_ram_cart(0);
    let mut ppu = PPU::new();
    sprite_scene(&mut ppu, &mut cart);
    place_sprite(&mut ppu, 0, 60, 0x04, 0x00, 60);
    place_sprite(&mut ppu, 1, 60, 0x05, 0x00, 100);
    place_sprite(&mut ppu, 2, 60, 0x04, 0x80, 140);
    render_frame(&mut ppu, &mut cart, 0x20);

    // Even tile: low table, tile 4 on top and tile 5 below.
    assert_eq!(pixel(&ppu, 63, 63), rgb(SPRITE_COLOR_2));
    assert_eq!(pixel(&ppu, 63, 71), rgb(SPRITE_COLOR_1));
    // Odd tile: high table, where 4 and 5 are swapped.
    assert_eq!(pixel(&ppu, 103, 63), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 103, 71), rgb(SPRITE_COLOR_2));
    // Vertical flip swaps the halves as well as the rows.
    assert_eq!(pixel(&ppu, 143, 63), rgb(SPRITE_COLOR_1));
    assert_eq!(pixel(&ppu, 143, 71), rgb(SPRITE_COLOR_2));
    // Below the 16th row nothing is drawn.
    assert_eq!(pixel(&ppu, 63, 76), rgb(BACKDROP));
}
