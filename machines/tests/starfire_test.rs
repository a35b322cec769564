use marquee_core::core::machine::Machine;
use marquee_core::core::{Bus, BusMaster};
use marquee_core::video::Bitmap;
use marquee_machines::{RomRegions, StarfireSystem};

const CPU: BusMaster = BusMaster::Cpu(0);

/// vidctrl1 with write protection lifted and the plain source op.
const UNPROTECTED: u8 = 0x20;

fn system() -> StarfireSystem {
    StarfireSystem::new(&RomRegions::from_slices(&[])).unwrap()
}

fn frame(sys: &mut StarfireSystem) -> Bitmap {
    let (w, h) = sys.display_size();
    let mut bitmap = Bitmap::new(w as usize, h as usize);
    sys.refresh(&mut bitmap, false);
    bitmap
}

// =================================================================
// Control registers and scratch RAM
// =================================================================

#[test]
fn test_control_registers_in_scratch_space() {
    let mut sys = system();
    sys.write(CPU, 0x9000, 0x80);
    sys.write(CPU, 0x9001, UNPROTECTED);
    sys.write(CPU, 0x9002, 0x42);
    assert_eq!(sys.video().vidctrl(), 0x80);
    assert_eq!(sys.video().vidctrl1(), UNPROTECTED);
    assert_eq!(sys.sound_control(), 0x42);
}

#[test]
fn test_scratch_ram_aliases_video_ram() {
    let mut sys = system();
    sys.write(CPU, 0x8005, 0x3C);
    assert_eq!(sys.read(CPU, 0x8005), 0x3C);
    assert_eq!(sys.video().videoram()[5], 0x3C);
    // A11 set reads inputs.
    assert_eq!(sys.read(CPU, 0x8805), 0xFF);
}

#[test]
fn test_video_ram_write_reads_back() {
    let mut sys = system();
    sys.write(CPU, 0x9001, UNPROTECTED);
    sys.write(CPU, 0xC440, 0xA5);
    assert_eq!(sys.read(CPU, 0xC440), 0xA5);
}

// =================================================================
// Rendering
// =================================================================

#[test]
fn test_pixels_from_video_ram_byte() {
    let mut sys = system();
    sys.write(CPU, 0x9001, UNPROTECTED);
    // Column 4, line 64: x 32-39.
    sys.write(CPU, 0xC440, 0xA5);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(32, 64), 0x20);
    assert_eq!(bitmap.pixel(33, 64), 0x00);
    assert_eq!(bitmap.pixel(34, 64), 0x20);
    assert_eq!(bitmap.pixel(39, 64), 0x20);
}

#[test]
fn test_colour_latch_follows_pixels() {
    let mut sys = system();
    sys.write(CPU, 0x9001, UNPROTECTED);
    sys.write(CPU, 0xA440, 0x05);
    sys.write(CPU, 0xC440, 0x80);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(32, 64), 0x25);
    assert_eq!(bitmap.pixel(33, 64), 0x05);
}

#[test]
fn test_tick_materializes_lines_as_the_beam_passes() {
    let mut sys = system();
    sys.write(CPU, 0x9001, UNPROTECTED);
    frame(&mut sys);
    sys.write(CPU, 0xC440, 0xFF);
    sys.write(CPU, 0xC496, 0xFF);
    assert!(sys.video().is_line_dirty(64));
    sys.tick(100);
    assert!(!sys.video().is_line_dirty(64));
    assert!(sys.video().is_line_dirty(150));
    let bitmap = frame(&mut sys);
    assert!(!sys.video().is_line_dirty(150));
    assert_eq!(bitmap.pixel(32, 150), 0x20);
}

#[test]
fn test_palette_write_through_colour_ram() {
    let mut sys = system();
    // TRANS on: the pseudo-palette area sets pens.
    sys.write(CPU, 0x9001, 0x40);
    sys.write(CPU, 0xA003, 0xFF);
    let (_, g, b) = sys.palette().rgb(3);
    assert_eq!((g, b), (0xFF, 0xFF));
}
