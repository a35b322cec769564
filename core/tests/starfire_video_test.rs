use marquee_core::device::StarfireVideo;
use marquee_core::video::palette::fixed;
use marquee_core::video::{Bitmap, Palette};

// vidctrl1 values: low nibble selects the op (inverted), 0x20 lifts write
// protection, 0x40 enables palette writes, 0x80 is CDRM.
const OP_SOURCE: u8 = 0x00;
const OP_XOR: u8 = 0x09;

fn video(vidctrl: u8, vidctrl1: u8) -> StarfireVideo {
    let mut v = StarfireVideo::new();
    v.set_vidctrl(vidctrl);
    v.set_vidctrl1(vidctrl1);
    v
}

#[test]
fn test_unshifted_source_write() {
    let mut v = video(0x00, OP_SOURCE);
    v.write(0x0440, 0xA5);
    assert_eq!(v.peek(0x0440), 0xA5);
    assert_eq!(v.peek(0x0540), 0x00);
    assert_eq!(v.read(0x0440), 0xA5);
}

#[test]
fn test_shift_spills_into_next_column() {
    // Shift 4 for A13 clear.
    let mut v = video(0x80, OP_SOURCE);
    v.write(0x0440, 0xFF);
    assert_eq!(v.peek(0x0440), 0x0F);
    assert_eq!(v.peek(0x0540), 0xF0);
    // Reading with the same shift reassembles the byte.
    assert_eq!(v.read(0x0440), 0xFF);
}

#[test]
fn test_mirror_reverses_bits() {
    let mut v = video(0x01, OP_SOURCE);
    v.write(0x2440, 0x01);
    assert_eq!(v.peek(0x0440), 0x80);
}

#[test]
fn test_xor_op_combines_with_ram() {
    let mut v = video(0x00, OP_XOR);
    v.poke(0x0440, 0xF0);
    v.write(0x0440, 0xFF);
    assert_eq!(v.peek(0x0440), 0x0F);
}

#[test]
fn test_protected_rows_ignore_writes() {
    let mut v = video(0x00, OP_SOURCE);
    v.write(0x0410, 0xFF);
    assert_eq!(v.peek(0x0410), 0x00);
    v.set_vidctrl1(OP_SOURCE | 0x20);
    v.write(0x0410, 0xFF);
    assert_eq!(v.peek(0x0410), 0xFF);
}

#[test]
fn test_latched_color_follows_pixels() {
    let mut v = video(0x00, OP_SOURCE);
    let mut palette = Palette::new(64, fixed);
    v.colorram_write(0x0440, 0x07, &mut palette);
    v.write(0x0441, 0x80);
    assert_eq!(v.colorram_read(0x0441), 0x07);
    // A13 set leaves colour RAM alone.
    v.write(0x2442, 0x80);
    assert_eq!(v.colorram_read(0x0442), 0x00);
}

#[test]
fn test_pseudo_palette_write() {
    let mut v = video(0x00, 0x40);
    let mut palette = Palette::new(64, fixed);
    // offset 0x205: pen 0x25, g = 7, b = 0, r = bits(1) << 1 | A8 = 2.
    v.colorram_write(0x0205, 0xE1, &mut palette);
    assert_eq!(palette.rgb(0x25), (0x49, 0xFF, 0x00));
    assert_eq!(v.colorram_read(0x0205), 0xE1);
    assert_eq!(v.colorram_read(0x0305), 0xE1);
}

#[test]
fn test_video_update_draws_dirty_lines_only() {
    let mut v = video(0x00, OP_SOURCE);
    let mut palette = Palette::new(64, fixed);
    let mut bitmap = Bitmap::new(256, 256);
    v.video_update(0, 256, &mut bitmap);

    v.colorram_write(0x0140, 0x03, &mut palette);
    v.write(0x0140, 0x81);
    assert!(v.is_line_dirty(0x40));
    assert!(!v.is_line_dirty(0x41));

    v.video_update(0x40, 1, &mut bitmap);
    assert!(!v.is_line_dirty(0x40));
    // Column 1 covers x = 8..15.
    assert_eq!(bitmap.pixel(8, 0x40), 0x23);
    assert_eq!(bitmap.pixel(9, 0x40), 0x03);
    assert_eq!(bitmap.pixel(15, 0x40), 0x23);
}
