use marquee_core::video::palette::{fixed, rrrrggggbbbbrgbx, xxxxbbbbggggrrrr};
use marquee_core::video::{DirtyCells, GfxElement, GfxLayout, Palette};

static PLANES: [u32; 2] = [0, 4];
static XS: [u32; 4] = [0, 1, 2, 3];
static YS: [u32; 1] = [0];

fn two_bit_gfx(rom: &[u8]) -> GfxElement {
    let layout = GfxLayout {
        width: 4,
        height: 1,
        total: 2,
        plane_offsets: &PLANES,
        x_offsets: &XS,
        y_offsets: &YS,
        char_increment: 8,
    };
    GfxElement::decode(&layout, rom, 0, 8)
}

#[test]
fn test_word_write_honours_mem_mask() {
    let mut p = Palette::new(16, rrrrggggbbbbrgbx);
    p.write_word(3, 0xF000, 0xFFFF);
    p.write_word(3, 0x0F00, 0x00FF);
    assert_eq!(p.raw(3), 0xF000);
    p.write_word(3, 0x0F00, 0xFF00);
    assert_eq!(p.raw(3), 0x0F00);
}

#[test]
fn test_split_pages() {
    let mut p = Palette::new(512, xxxxbbbbggggrrrr);
    p.write_split_lo(0x101, 0x0F);
    assert_eq!(p.rgb(0x101), (0xFF, 0, 0));
    p.write_split_hi(0x101, 0x0F);
    assert_eq!(p.rgb(0x101), (0xFF, 0, 0xFF));
}

#[test]
fn test_mark_gfx_used_marks_only_drawn_pixels() {
    // Element 0 uses pixel values 0 and 3 only.
    let gfx = two_bit_gfx(&[0b1010_1010, 0]);
    let mut p = Palette::new(32, fixed);
    p.mark_gfx_used(&gfx, 0, 2);
    assert!(p.is_used(8));
    assert!(!p.is_used(9));
    assert!(!p.is_used(10));
    assert!(p.is_used(11));
}

#[test]
fn test_recalc_invalidates_cleared_cells() {
    let gfx = two_bit_gfx(&[0xFF, 0]);
    let mut p = Palette::new(32, fixed);
    let mut dirty = DirtyCells::try_new(64).unwrap();
    dirty.clear();

    p.clear_all_used();
    p.mark_gfx_used(&gfx, 0, 1);
    if p.recalc() {
        dirty.mark_all();
    }
    assert!((0..64).all(|i| dirty.is_dirty(i)));

    // Same colours next frame: caches stay valid.
    dirty.clear();
    p.clear_all_used();
    p.mark_gfx_used(&gfx, 0, 1);
    if p.recalc() {
        dirty.mark_all();
    }
    assert!(!dirty.any());
}

#[test]
fn test_colortable_lookup_wraps() {
    let p = Palette::new(4, fixed).with_colortable(vec![3, 2, 1]);
    assert_eq!(p.pen(0), 3);
    assert_eq!(p.pen(4), 2);
}
