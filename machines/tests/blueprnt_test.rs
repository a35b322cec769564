use marquee_core::core::machine::Machine;
use marquee_core::core::{Bus, BusMaster};
use marquee_core::video::Bitmap;
use marquee_machines::{BlueprntSystem, RomRegions};

const CPU: BusMaster = BusMaster::Cpu(0);

/// Character 5 has both planes set everywhere (pixel value 3).
fn regions() -> RomRegions {
    let mut gfx1 = vec![0u8; 0x2000];
    gfx1[5 * 8..6 * 8].fill(0xFF);
    gfx1[0x1000 + 5 * 8..0x1000 + 6 * 8].fill(0xFF);
    RomRegions::from_slices(&[("gfx1", &gfx1), ("gfx2", &[0u8; 0x3000])])
}

fn frame(sys: &mut BlueprntSystem) -> Bitmap {
    let (w, h) = sys.display_size();
    let mut bitmap = Bitmap::new(w as usize, h as usize);
    sys.refresh(&mut bitmap, false);
    bitmap
}

// =================================================================
// Construction
// =================================================================

#[test]
fn test_missing_gfx_region_is_an_error() {
    let regions = RomRegions::from_slices(&[("gfx1", &[0u8; 0x2000])]);
    assert!(BlueprntSystem::new(&regions).is_err());
}

#[test]
fn test_display_geometry() {
    let sys = BlueprntSystem::new(&regions()).unwrap();
    assert_eq!(sys.display_size(), (256, 256));
    let visible = sys.visible_area();
    assert_eq!((visible.min_y, visible.max_y), (16, 239));
}

// =================================================================
// End-to-end tile rendering
// =================================================================

#[test]
fn test_single_tile_scenario() {
    let mut sys = BlueprntSystem::new(&regions()).unwrap();
    sys.write(CPU, 0x9000, 5);
    sys.write(CPU, 0xF000, 2);

    let bitmap = frame(&mut sys);
    let expected = sys.palette().pen(sys.gfx()[0].color_index(2, 3));
    // Colour 2: base 8, a = 2, b = 0; pixel 3 takes the OR entry.
    assert_eq!(expected, 10);
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(bitmap.pixel(x, y), expected, "pixel ({x}, {y})");
        }
    }
    // Neighbouring cell: code 0, colour 0.
    assert_eq!(bitmap.pixel(8, 0), 8);
}

#[test]
fn test_column_scroll_moves_tile_up() {
    let mut sys = BlueprntSystem::new(&regions()).unwrap();
    sys.write(CPU, 0x9000 + 32, 5); // column 0, row 1
    sys.write(CPU, 0xF000 + 32, 2);
    // Column 0 takes its scroll from byte 30.
    sys.write(CPU, 0xA000 + 30, 8);

    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(0, 0), 10);
    assert_eq!(bitmap.pixel(0, 8), 8);
    // Column 1 is unscrolled.
    assert_eq!(bitmap.pixel(8, 8), 8);
}

#[test]
fn test_priority_chars_cover_sprites() {
    let mut gfx2 = vec![0u8; 0x3000];
    // Sprite 1: all three planes set.
    for third in 0..3 {
        gfx2[third * 0x1000 + 16..third * 0x1000 + 32].fill(0xFF);
    }
    let mut gfx1 = vec![0u8; 0x2000];
    gfx1[5 * 8..6 * 8].fill(0xFF);
    gfx1[0x1000 + 5 * 8..0x1000 + 6 * 8].fill(0xFF);
    let regions = RomRegions::from_slices(&[("gfx1", &gfx1), ("gfx2", &gfx2)]);
    let mut sys = BlueprntSystem::new(&regions).unwrap();

    // Sprite 0 at x = 2 + 14 = 16, y = 240 - 225 - 1 = 14.
    sys.write(CPU, 0xB000, 225);
    sys.write(CPU, 0xB001, 1);
    sys.write(CPU, 0xB003, 14);

    let bitmap = frame(&mut sys);
    let sprite_pen = sys.palette().pen(sys.gfx()[1].color_index(0, 7));
    assert_eq!(bitmap.pixel(16, 16), sprite_pen);

    // Cell (2, 2) with the priority bit now draws over the sprite.
    sys.write(CPU, 0x9000 + 2 * 32 + 2, 5);
    sys.write(CPU, 0xF000 + 2 * 32 + 2, 0x82);
    let bitmap = frame(&mut sys);
    assert_eq!(bitmap.pixel(16, 16), 10);
}

// =================================================================
// Dirty tracking
// =================================================================

#[test]
fn test_redundant_write_does_not_dirty() {
    let mut sys = BlueprntSystem::new(&regions()).unwrap();
    sys.write(CPU, 0x9000, 5);
    frame(&mut sys);
    assert!(!sys.is_cell_dirty(0));

    sys.write(CPU, 0x9000, 5);
    sys.write(CPU, 0xF000, 0);
    assert!(!sys.is_cell_dirty(0));

    sys.write(CPU, 0x9000, 6);
    assert!(sys.is_cell_dirty(0));
}

#[test]
fn test_video_ram_mirror() {
    let mut sys = BlueprntSystem::new(&regions()).unwrap();
    sys.write(CPU, 0x9400 + 3, 0x42);
    assert_eq!(sys.read(CPU, 0x9003), 0x42);
}

#[test]
fn test_flip_toggle_marks_everything_dirty() {
    let mut sys = BlueprntSystem::new(&regions()).unwrap();
    sys.write(CPU, 0xE000, 0x02); // not flipped, bank 0: no change
    frame(&mut sys);
    sys.write(CPU, 0xE000, 0x02);
    assert!(!sys.is_cell_dirty(100));

    sys.write(CPU, 0xE000, 0x00);
    assert!((0..0x400).all(|i| sys.is_cell_dirty(i)));
}

#[test]
fn test_sound_command_and_dipsw() {
    let mut sys = BlueprntSystem::new(&regions()).unwrap();
    sys.write(CPU, 0xD000, 0x3C);
    assert_eq!(sys.sound_command(), 0x3C);
    sys.set_dipsw(0xA5);
    assert_eq!(sys.read(CPU, 0xC003), 0xA5);
}
