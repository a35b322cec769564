use marquee_core::core::machine::Machine;
use marquee_core::core::{Bus, BusMaster};
use marquee_core::video::Bitmap;
use marquee_machines::supbtime::wrap_sprite_position;
use marquee_machines::{RomRegions, SupbtimeSystem};

const CPU: BusMaster = BusMaster::Cpu(0);
const SPRITES: u32 = 0x120000;
const PF1: u32 = 0x320000;
const CONTROL: u32 = 0x300000;

/// Pen of pf2 tile 0 (blank, colour 0): the first playfield-2 colour.
const PF2_BLANK: u16 = 512;

fn build(gfx1: Vec<u8>, gfx2: Vec<u8>) -> SupbtimeSystem {
    let regions = RomRegions::from_slices(&[("gfx1", &gfx1), ("gfx2", &gfx2)]);
    SupbtimeSystem::new(&regions).unwrap()
}

/// Sprites 1, 2 and 3 solid (pixel 15), everything else blank.
fn with_sprites() -> SupbtimeSystem {
    let mut gfx2 = vec![0u8; 0x100000];
    gfx2[128..512].fill(0xFF);
    build(vec![0u8; 0x80000], gfx2)
}

fn frame(sys: &mut SupbtimeSystem) -> Bitmap {
    let (w, h) = sys.display_size();
    let mut bitmap = Bitmap::new(w as usize, h as usize);
    sys.refresh(&mut bitmap, false);
    bitmap
}

fn put_sprite(sys: &mut SupbtimeSystem, n: u32, y: u16, code: u16, x: u16) {
    let base = SPRITES + n * 8;
    sys.write(CPU, base, y);
    sys.write(CPU, base + 2, code);
    sys.write(CPU, base + 4, x);
}

// =================================================================
// Sprite position wraparound
// =================================================================

#[test]
fn test_x_past_320_wraps_negative() {
    assert_eq!(wrap_sprite_position(400, 0), (-112, 0));
    assert_eq!(wrap_sprite_position(319, 0), (319, 0));
}

#[test]
fn test_y_past_256_wraps_negative() {
    assert_eq!(wrap_sprite_position(0, 300), (0, -212));
    assert_eq!(wrap_sprite_position(0, 255), (0, 255));
}

#[test]
fn test_position_is_nine_bits() {
    // Colour bits above bit 8 never leak into the position.
    assert_eq!(wrap_sprite_position(0xFE00 | 10, 0xF000 | 20), (10, 20));
}

// =================================================================
// Sprite drawing
// =================================================================

#[test]
fn test_sprite_screen_position() {
    let mut sys = with_sprites();
    // x = 304 - 100, y = 240 - 100
    put_sprite(&mut sys, 0, 100, 1, 100);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(204, 140), 15);
    assert_eq!(bitmap.pixel(219, 155), 15);
    assert_eq!(bitmap.pixel(203, 140), PF2_BLANK);
    assert_eq!(bitmap.pixel(204, 156), PF2_BLANK);
}

#[test]
fn test_wrapped_sprite_enters_right_edge() {
    let mut sys = with_sprites();
    // 500 - 512 = -12, so x = 304 + 12 = 316.
    put_sprite(&mut sys, 0, 100, 1, 500);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(316, 140), 15);
    assert_eq!(bitmap.pixel(319, 140), 15);
    assert_eq!(bitmap.pixel(315, 140), PF2_BLANK);
}

#[test]
fn test_sprite_past_right_edge_is_skipped() {
    let mut sys = with_sprites();
    // 400 wraps to -112, x = 416 > 320.
    put_sprite(&mut sys, 0, 100, 1, 400);
    let bitmap = frame(&mut sys);
    assert!(bitmap.pixels().iter().all(|&p| p != 15));
}

#[test]
fn test_double_height_sprite() {
    let mut sys = with_sprites();
    // Height bits 01: two cells, code 3 -> cells 2 (top) and 3 (bottom).
    put_sprite(&mut sys, 0, 0x0200 | 100, 3, 100);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(204, 124), 15);
    assert_eq!(bitmap.pixel(204, 140), 15);
    assert_eq!(bitmap.pixel(204, 123), PF2_BLANK);
}

#[test]
fn test_flash_sprite_blinks() {
    let mut sys = with_sprites();
    put_sprite(&mut sys, 0, 0x1000 | 100, 1, 100);
    assert_eq!(frame(&mut sys).pixel(204, 140), 15);
    assert_eq!(frame(&mut sys).pixel(204, 140), PF2_BLANK);
    assert_eq!(frame(&mut sys).pixel(204, 140), 15);
}

#[test]
fn test_sprite_code_zero_is_empty() {
    let mut sys = with_sprites();
    put_sprite(&mut sys, 0, 100, 0, 100);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(204, 140), PF2_BLANK);
}

// =================================================================
// Playfields
// =================================================================

/// Char 1 solid (pixel 15). Tile 0 overlaps it, so pf2 is not blank here.
fn with_char1() -> SupbtimeSystem {
    let mut gfx1 = vec![0u8; 0x80000];
    gfx1[16..32].fill(0xFF);
    gfx1[0x40000 + 16..0x40000 + 32].fill(0xFF);
    build(gfx1, vec![0u8; 0x100000])
}

#[test]
fn test_pf1_tile_over_everything() {
    let mut sys = with_char1();
    sys.write(CPU, PF1, 0x1001);
    let bitmap = frame(&mut sys);
    // Colour 1, pixel 15 of the pf1 colours at 256.
    assert_eq!(bitmap.pixel(0, 0), 256 + 16 + 15);
    assert_eq!(bitmap.pixel(7, 7), 256 + 16 + 15);
}

#[test]
fn test_pf1_scroll_x() {
    let mut sys = with_char1();
    sys.write(CPU, PF1 + 2, 0x1001);
    sys.write(CPU, CONTROL + 2, 8);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(0, 0), 256 + 16 + 15);
}

#[test]
fn test_flip_mirrors_playfield() {
    let mut sys = with_char1();
    sys.write(CPU, PF1, 0x1001);
    sys.write(CPU, CONTROL, 0x0080);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(319, 255), 256 + 16 + 15);
    assert_eq!(bitmap.pixel(312, 248), 256 + 16 + 15);
}

#[test]
fn test_redundant_write_does_not_dirty() {
    let mut sys = with_char1();
    sys.write(CPU, PF1, 0x1001);
    frame(&mut sys);
    assert!(!sys.is_pf1_dirty(0));

    sys.write_masked(CPU, PF1, 0x1000, 0xFF00);
    assert!(!sys.is_pf1_dirty(0));

    sys.write_masked(CPU, PF1, 0x0002, 0x00FF);
    assert!(sys.is_pf1_dirty(0));
}

#[test]
fn test_palette_recalc_marks_both_playfields_dirty() {
    let mut sys = with_char1();
    frame(&mut sys);
    assert!(!sys.recalc_palette(false));
    assert!(!sys.is_pf1_dirty(500));
    assert!(!sys.is_pf2_dirty(500));

    // Playfield 1 cell 10 moves to colour 5.
    sys.write(CPU, PF1 + 2 * 10, 0x5000);
    assert!(sys.recalc_palette(false));
    assert!((0..64 * 32).all(|i| sys.is_pf1_dirty(i) && sys.is_pf2_dirty(i)));
}

#[test]
fn test_full_refresh_marks_both_playfields_dirty() {
    let mut sys = with_char1();
    frame(&mut sys);
    assert!(sys.recalc_palette(true));
    assert!(sys.is_pf1_dirty(0));
    assert!(sys.is_pf2_dirty(2047));
}

#[test]
fn test_palette_write() {
    let mut sys = with_sprites();
    sys.write(CPU, 0x140000 + 2 * 5, 0x0F00);
    assert_eq!(sys.read(CPU, 0x140000 + 2 * 5), 0x0F00);
    assert_eq!(sys.palette().rgb(5), (0, 0, 0xFF));
}
