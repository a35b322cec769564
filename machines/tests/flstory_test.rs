use marquee_core::core::machine::Machine;
use marquee_core::core::{Bus, BusMaster};
use marquee_core::video::Bitmap;
use marquee_machines::{FlstorySystem, RomRegions};

const CPU: BusMaster = BusMaster::Cpu(0);

/// Char 0x401 (video code 1) has its upper-half planes set: pixel 12.
fn system() -> FlstorySystem {
    let mut gfx1 = vec![0u8; 0x20000];
    gfx1[0x10000 + 0x4010..0x10000 + 0x4020].fill(0xFF);
    FlstorySystem::new(&RomRegions::from_slices(&[("gfx1", &gfx1)])).unwrap()
}

fn frame(sys: &mut FlstorySystem) -> Bitmap {
    let (w, h) = sys.display_size();
    let mut bitmap = Bitmap::new(w as usize, h as usize);
    sys.refresh(&mut bitmap, false);
    bitmap
}

fn put_cell(sys: &mut FlstorySystem, cell: u16, code: u8, attr: u8) {
    sys.write(CPU, 0xC000 + cell * 2, code);
    sys.write(CPU, 0xC001 + cell * 2, attr);
}

/// Sprite slot 0: blank graphics (pixel 0 is opaque), colour 3.
fn put_sprite(sys: &mut FlstorySystem, x: u8, y: u8) {
    sys.write(CPU, 0xDC00, y);
    sys.write(CPU, 0xDC01, 0x03);
    sys.write(CPU, 0xDC02, 0x00);
    sys.write(CPU, 0xDC03, x);
}

const CHAR_PEN: u16 = 2 * 16 + 12;
const SPRITE_PEN: u16 = 256 + 3 * 16;

// =================================================================
// Sound handshake
// =================================================================

#[test]
fn test_handshake_reads_fixed_values() {
    let mut sys = system();
    assert_eq!(sys.read(CPU, 0xD400), 0x14);
    assert_eq!(sys.read(CPU, 0xD401), 0xEF);
}

#[test]
fn test_sound_command_latch() {
    let mut sys = system();
    sys.write(CPU, 0xD400, 0x55);
    assert_eq!(sys.sound_command(), 0x55);
    // Reads are unaffected by the latch.
    assert_eq!(sys.read(CPU, 0xD400), 0x14);
}

// =================================================================
// Palette
// =================================================================

#[test]
fn test_split_palette_pages() {
    let mut sys = system();
    sys.write(CPU, 0xDD05, 0x34);
    sys.write(CPU, 0xDE05, 0x12);
    assert_eq!(sys.palette().raw(5), 0x1234);
    assert_eq!(sys.read(CPU, 0xDD05), 0x34);
    assert_eq!(sys.read(CPU, 0xDE05), 0x12);
}

#[test]
fn test_palette_bank_selects_upper_256() {
    let mut sys = system();
    sys.write(CPU, 0xDF03, 0x21);
    assert_eq!(sys.palette_bank(), 1);
    sys.write(CPU, 0xDD05, 0x0F);
    assert_eq!(sys.palette().raw(0x105), 0x000F);
    assert_eq!(sys.palette().raw(5), 0);
}

// =================================================================
// Text layer and priority
// =================================================================

#[test]
fn test_char_cell_drawn() {
    let mut sys = system();
    put_cell(&mut sys, 0, 1, 0x02);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(0, 0), CHAR_PEN);
    assert_eq!(bitmap.pixel(7, 7), CHAR_PEN);
    assert_eq!(bitmap.pixel(8, 0), 0);
}

#[test]
fn test_column_scroll() {
    let mut sys = system();
    put_cell(&mut sys, 32, 1, 0x02); // column 0, row 1
    sys.write(CPU, 0xDCA0, 8);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(0, 0), CHAR_PEN);
    assert_eq!(bitmap.pixel(8, 8), 0);
}

#[test]
fn test_sprite_under_plain_char() {
    let mut sys = system();
    put_cell(&mut sys, 17 * 32 + 6, 1, 0x02);
    // y = 240 - 100 - 1 = 139
    put_sprite(&mut sys, 50, 100);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(50, 139), SPRITE_PEN);
    assert_eq!(bitmap.pixel(65, 154), SPRITE_PEN);
}

#[test]
fn test_priority_char_over_first_pass() {
    let mut sys = system();
    put_cell(&mut sys, 17 * 32 + 6, 1, 0x22);
    put_sprite(&mut sys, 50, 100);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(50, 139), CHAR_PEN);
    // Outside the priority cell the sprite still shows.
    assert_eq!(bitmap.pixel(56, 139), SPRITE_PEN);
}

#[test]
fn test_second_pass_over_priority_char() {
    let mut sys = system();
    put_cell(&mut sys, 17 * 32 + 6, 1, 0x22);
    put_sprite(&mut sys, 50, 100);
    // First draw-order entry: slot 0 in the high-priority pass.
    sys.write(CPU, 0xDC9F, 0x80);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(50, 139), SPRITE_PEN);
}

#[test]
fn test_sprite_wraps_left_edge() {
    let mut sys = system();
    put_sprite(&mut sys, 250, 100);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(255, 139), SPRITE_PEN);
    assert_eq!(bitmap.pixel(9, 139), SPRITE_PEN);
    assert_eq!(bitmap.pixel(10, 139), 0);
}

// =================================================================
// Dirty tracking
// =================================================================

#[test]
fn test_redundant_write_does_not_dirty() {
    let mut sys = system();
    put_cell(&mut sys, 3, 1, 0x02);
    frame(&mut sys);
    assert!(!sys.is_cell_dirty(3));
    put_cell(&mut sys, 3, 1, 0x02);
    assert!(!sys.is_cell_dirty(3));
    sys.write(CPU, 0xC007, 0x03);
    assert!(sys.is_cell_dirty(3));
}

#[test]
fn test_palette_recalc_marks_everything_dirty() {
    let mut sys = system();
    frame(&mut sys);
    assert!(!sys.recalc_palette(false));
    assert!(!sys.is_cell_dirty(200));

    // Colour 5 is new to the used set.
    put_cell(&mut sys, 10, 0, 0x05);
    assert!(sys.recalc_palette(false));
    assert!((0..0x400).all(|i| sys.is_cell_dirty(i)));
}

#[test]
fn test_full_refresh_marks_everything_dirty() {
    let mut sys = system();
    frame(&mut sys);
    assert!(sys.recalc_palette(true));
    assert!((0..0x400).all(|i| sys.is_cell_dirty(i)));
}

#[test]
fn test_char_bank_marks_everything_dirty() {
    let mut sys = system();
    sys.write(CPU, 0xDF03, 0x01);
    frame(&mut sys);
    sys.write(CPU, 0xDF03, 0x01);
    assert!(!sys.is_cell_dirty(0));
    sys.write(CPU, 0xDF03, 0x11);
    assert!((0..0x400).all(|i| sys.is_cell_dirty(i)));
}
