use marquee_core::core::machine::Machine;
use marquee_core::core::{AddressMap, Bus, BusMaster};
use marquee_core::video::palette::rrrrggggbbbbxxxx;
use marquee_core::video::{
    Bitmap, DirtyCells, GfxDraw, GfxElement, GfxLayout, Palette, Rect, Transparency,
    copy_scroll_bitmap, draw_gfx, draw_gfx_rows,
};

use crate::regions::{MachineError, RegionSpec, RomRegions};
use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Regions and graphics layouts
// ---------------------------------------------------------------------------

pub static CITYCON_REGIONS: [RegionSpec; 5] = [
    RegionSpec::optional("cpu1", 0xC000),
    RegionSpec::required("gfx1", 0x1000),
    RegionSpec::required("gfx2", 0x4000),
    RegionSpec::required("gfx3", 0x18000),
    // Background map: tile codes per image, then a colour byte per code.
    RegionSpec::required("gfx4", 0xE000),
];

static X8_HALVES: [u32; 8] = [0, 1, 2, 3, 256 * 64, 256 * 64 + 1, 256 * 64 + 2, 256 * 64 + 3];
static X8_SPRITE_HALVES: [u32; 8] = [
    0,
    1,
    2,
    3,
    128 * 128,
    128 * 128 + 1,
    128 * 128 + 2,
    128 * 128 + 3,
];
static Y8: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];
static Y16: [u32; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 72, 80, 88, 96, 104, 112, 120,
];
static CHAR_PLANES: [u32; 2] = [4, 0];
static SPRITE_PLANES: [u32; 4] = [4, 0, 0x2000 * 8 + 4, 0x2000 * 8];
static TILE_PLANES: [u32; 4] = [4, 0, 0xC000 * 8 + 4, 0xC000 * 8];

/// 8×8, 2bpp; pixels 4-7 live 0x800 bytes after pixels 0-3.
pub static CHAR_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 8,
    total: 256,
    plane_offsets: &CHAR_PLANES,
    x_offsets: &X8_HALVES,
    y_offsets: &Y8,
    char_increment: 64,
};

/// 8×16, 4bpp; two planes per nibble pair, the other two 0x2000 bytes on.
pub static SPRITE_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 16,
    total: 128,
    plane_offsets: &SPRITE_PLANES,
    x_offsets: &X8_SPRITE_HALVES,
    y_offsets: &Y16,
    char_increment: 128,
};

/// 8×8, 4bpp background tiles; one 256-tile set per 0x1000 bytes.
pub static TILE_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 8,
    total: 256,
    plane_offsets: &TILE_PLANES,
    x_offsets: &X8_HALVES,
    y_offsets: &Y8,
    char_increment: 64,
};

/// Number of background images in the tile and map ROMs.
pub const BG_IMAGES: usize = 12;

const SCREEN_WIDTH: u32 = 256;
const SCREEN_HEIGHT: u32 = 256;
const VISIBLE: Rect = Rect::new(0, 255, 16, 239);

const SPRITE_COLOR_BASE: usize = 0;
const BG_COLOR_BASE: usize = 256;
const CHAR_COLOR_BASE: usize = 512;
const TOTAL_COLORS: usize = 640;

/// Text rows above this line never scroll (the score panel).
const FIXED_ROWS: usize = 6;

// ---------------------------------------------------------------------------
// Memory map
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Ram,
    VideoRam,
    CharLookup,
    SpriteRam,
    /// W: background image / flip. R: inputs.
    Background,
    SoundLatch,
    SoundLatch2,
    Scroll,
    Watchdog,
    Palette,
    Rom,
}

fn memory_map() -> Result<AddressMap<Region>, MachineError> {
    Ok(AddressMap::new(
        0xFFFF,
        [
            (0x0000..=0x0FFF, Region::Ram),
            (0x1000..=0x1FFF, Region::VideoRam),
            (0x2000..=0x20FF, Region::CharLookup),
            (0x2800..=0x28FF, Region::SpriteRam),
            (0x3000..=0x3000, Region::Background),
            (0x3001..=0x3001, Region::SoundLatch),
            (0x3002..=0x3002, Region::SoundLatch2),
            (0x3004..=0x3005, Region::Scroll),
            (0x3007..=0x3007, Region::Watchdog),
            (0x3800..=0x3CFF, Region::Palette),
            (0x4000..=0xFFFF, Region::Rom),
        ],
    )?)
}

/// City Connection (Jaleco, 1985)
///
/// Hardware: 6809 main CPU, 6809 + YM2203/AY sound board (not emulated).
/// Video: a 128×32 background whose tile map lives in ROM (one of twelve
/// images selected by a register), a 64×32 text layer coloured per scanline
/// rather than per cell, and 8×16 sprites. The text layer's top six rows are
/// a fixed panel; the rest scrolls with the background at twice its speed.
///
/// ```text
/// 0000-0FFF  work RAM
/// 1000-1FFF  text layer, 1 byte per cell
/// 2000-20FF  colour code for each scanline of the text layer
/// 2800-28FF  sprite RAM, 4 bytes per sprite
/// 3000       W: bits 4-7 background image, bit 0 flip. R: inputs
/// 3001/3002  sound latches (write), DIP switches (read)
/// 3004-3005  scroll, big-endian
/// 3007       watchdog (read)
/// 3800-3CFF  palette RAM, RRRRGGGGBBBBxxxx, even byte high
/// 4000-FFFF  program ROM
/// ```
pub struct CityconSystem {
    map: AddressMap<Region>,
    rom: Vec<u8>,
    bg_map: Vec<u8>,
    ram: Vec<u8>,
    videoram: Vec<u8>,
    charlookup: [u8; 0x100],
    spriteram: [u8; 0x100],
    scroll: [u8; 2],

    dirty: DirtyCells,
    /// One flag per 8-line text row whose colour lookup changed.
    lookup_dirty: DirtyCells,
    bg_dirty: bool,
    fg_bitmap: Bitmap,
    bg_bitmap: Bitmap,
    gfx: Vec<GfxElement>,
    palette: Palette,

    flip_screen: bool,
    bg_image: usize,
    sound_latch: [u8; 2],
}

impl CityconSystem {
    pub fn new(regions: &RomRegions) -> Result<Self, MachineError> {
        let rom = regions.load(&CITYCON_REGIONS[0])?;
        let gfx1 = regions.load(&CITYCON_REGIONS[1])?;
        let gfx2 = regions.load(&CITYCON_REGIONS[2])?;
        let gfx3 = regions.load(&CITYCON_REGIONS[3])?;
        let bg_map = regions.load(&CITYCON_REGIONS[4])?;

        let mut gfx = vec![
            GfxElement::decode(&CHAR_LAYOUT, &gfx1, CHAR_COLOR_BASE, 32),
            GfxElement::decode(&SPRITE_LAYOUT, &gfx2, SPRITE_COLOR_BASE, 16),
            GfxElement::decode(&SPRITE_LAYOUT, &gfx2[0x1000..], SPRITE_COLOR_BASE, 16),
        ];
        for image in 0..BG_IMAGES {
            gfx.push(GfxElement::decode(
                &TILE_LAYOUT,
                &gfx3[image * 0x1000..],
                BG_COLOR_BASE,
                16,
            ));
        }
        log::debug!("citycon: decoded {} graphics sets", gfx.len());

        Ok(Self {
            map: memory_map()?,
            rom,
            bg_map,
            ram: vec![0; 0x1000],
            videoram: vec![0; 0x1000],
            charlookup: [0; 0x100],
            spriteram: [0; 0x100],
            scroll: [0; 2],
            dirty: DirtyCells::try_new(0x1000)?,
            lookup_dirty: DirtyCells::try_new(32)?,
            bg_dirty: true,
            fg_bitmap: Bitmap::try_new(512, 256)?,
            bg_bitmap: Bitmap::try_new(1024, 256)?,
            gfx,
            palette: build_palette(),
            flip_screen: false,
            bg_image: 0,
            sound_latch: [0; 2],
        })
    }

    pub fn sound_latch(&self, which: usize) -> u8 {
        self.sound_latch[which & 1]
    }

    pub fn bg_image(&self) -> usize {
        self.bg_image
    }

    pub fn is_cell_dirty(&self, offs: usize) -> bool {
        self.dirty.is_dirty(offs)
    }

    pub fn is_background_dirty(&self) -> bool {
        self.bg_dirty
    }

    /// Rebuild the used-pen set. A changed set or a full refresh redraws
    /// the text layer and the background image.
    pub fn recalc_palette(&mut self, full_refresh: bool) -> bool {
        self.mark_palette_usage();
        let invalidate = self.palette.recalc() || full_refresh;
        if invalidate {
            self.dirty.mark_all();
            self.bg_dirty = true;
        }
        invalidate
    }

    fn scroll_value(&self) -> i32 {
        (self.scroll[0] as i32) << 8 | self.scroll[1] as i32
    }

    fn videoram_w(&mut self, offs: usize, data: u8) {
        if self.videoram[offs] != data {
            self.videoram[offs] = data;
            self.dirty.mark(offs);
        }
    }

    fn charlookup_w(&mut self, offs: usize, data: u8) {
        if self.charlookup[offs] != data {
            self.charlookup[offs] = data;
            self.lookup_dirty.mark(offs / 8);
        }
    }

    fn background_w(&mut self, data: u8) {
        let image = (data >> 4) as usize;
        if self.bg_image != image {
            log::trace!("citycon: background image {image}");
            self.bg_image = image;
            self.bg_dirty = true;
        }
        let flip = data & 1 != 0;
        if self.flip_screen != flip {
            self.flip_screen = flip;
            self.dirty.mark_all();
            self.bg_dirty = true;
        }
    }

    fn palette_w(&mut self, offs: usize, data: u8) {
        if offs & 1 == 0 {
            self.palette.write_word(offs / 2, (data as u16) << 8, 0xFF00);
        } else {
            self.palette.write_word(offs / 2, data as u16, 0x00FF);
        }
    }

    fn palette_r(&self, offs: usize) -> u8 {
        let word = self.palette.raw(offs / 2);
        if offs & 1 == 0 {
            (word >> 8) as u8
        } else {
            word as u8
        }
    }

    /// Background tile code and colour for map cell `offs` of the current
    /// image. Images past the last one wrap.
    fn bg_tile(&self, offs: usize) -> (usize, usize) {
        let image = self.bg_image % BG_IMAGES;
        let code = self.bg_map[0x1000 * image + offs] as usize;
        let color = self.bg_map[0xC000 + 0x100 * image + code] as usize;
        (code, color)
    }

    fn mark_palette_usage(&mut self) {
        self.palette.clear_all_used();
        // Transparent text pixels resolve to pen 0.
        self.palette.mark_used(0);

        let bg = &self.gfx[3 + self.bg_image % BG_IMAGES];
        for offs in 0..0x1000 {
            let (code, color) = self.bg_tile(offs);
            self.palette.mark_gfx_used(bg, code, color);
        }
        for &color in self.charlookup.iter() {
            self.palette.mark_color_used(&self.gfx[0], color as usize);
        }
        for offs in (0..0x100).step_by(4) {
            let set = if self.spriteram[offs + 1] & 0x80 != 0 { 2 } else { 1 };
            let color = (self.spriteram[offs + 2] & 0x0F) as usize;
            self.palette.mark_color_used(&self.gfx[set], color);
        }
    }

    fn draw_background(&mut self) {
        let bg = 3 + self.bg_image % BG_IMAGES;
        let clip = self.bg_bitmap.bounds();
        for offs in 0..0x1000 {
            let sy = offs / 32;
            let mut sx = ((offs % 32) + (sy & 0x60)) as i32;
            let mut sy = (sy & 31) as i32;
            if self.flip_screen {
                sx = 127 - sx;
                sy = 31 - sy;
            }
            let (code, color) = self.bg_tile(offs);
            let d = GfxDraw::new(code, color, 8 * sx, 8 * sy)
                .flipped(self.flip_screen, self.flip_screen);
            draw_gfx(
                &mut self.bg_bitmap,
                &self.gfx[bg],
                &self.palette,
                &d,
                &clip,
                Transparency::Opaque,
            );
        }
    }

    fn draw_text_layer(&mut self) {
        let clip = self.fg_bitmap.bounds();
        for offs in (0..0x1000).rev() {
            let row = offs / 32;
            let mut sx = ((offs % 32) + (row & 0x20)) as i32;
            let mut sy = (row & 0x1F) as i32;
            let lookup_changed = self.lookup_dirty.is_dirty(sy as usize);
            if !self.dirty.take(offs) && !lookup_changed {
                continue;
            }
            if self.flip_screen {
                sx = 63 - sx;
                sy = 31 - sy;
            }
            let d = GfxDraw::new(self.videoram[offs] as usize, 0, 8 * sx, 8 * sy)
                .flipped(self.flip_screen, self.flip_screen);
            let lookup = &self.charlookup;
            let flip = self.flip_screen;
            draw_gfx_rows(
                &mut self.fg_bitmap,
                &self.gfx[0],
                &self.palette,
                &d,
                &clip,
                Transparency::Opaque,
                |line| {
                    let line = line as usize & 0xFF;
                    lookup[if flip { 255 - line } else { line }] as usize
                },
            );
        }
        self.lookup_dirty.clear();
    }

    fn text_row_scroll(&self) -> [i32; 32] {
        let scroll = self.scroll_value();
        let mut rows = [0i32; 32];
        for i in 0..32 {
            let fixed = i < FIXED_ROWS;
            if self.flip_screen {
                // Mirrored: the fixed panel sits at the bottom.
                rows[31 - i] = if fixed { 256 } else { 256 + scroll };
            } else {
                rows[i] = if fixed { 0 } else { -scroll };
            }
        }
        rows
    }

    fn draw_sprites(&self, bitmap: &mut Bitmap, clip: &Rect) {
        for offs in (0..0x100).step_by(4).rev() {
            let s = &self.spriteram[offs..offs + 4];
            let mut sx = s[3] as i32;
            let mut sy = 239 - s[0] as i32;
            let mut flip_x = s[2] & 0x10 == 0;
            if self.flip_screen {
                sx = 240 - sx;
                sy = 238 - sy;
                flip_x = !flip_x;
            }
            let set = if s[1] & 0x80 != 0 { 2 } else { 1 };
            let d = GfxDraw::new((s[1] & 0x7F) as usize, (s[2] & 0x0F) as usize, sx, sy)
                .flipped(flip_x, self.flip_screen);
            draw_gfx(bitmap, &self.gfx[set], &self.palette, &d, clip, Transparency::Pen(0));
        }
    }
}

/// Identity colour table, except that pixel 0 of every text colour maps to
/// pen 0 so the text layer can be copied with pen 0 transparent.
fn build_palette() -> Palette {
    let table = (0..TOTAL_COLORS as u16)
        .map(|i| {
            if i as usize >= CHAR_COLOR_BASE && (i as usize - CHAR_COLOR_BASE) % 4 == 0 {
                0
            } else {
                i
            }
        })
        .collect();
    Palette::new(TOTAL_COLORS, rrrrggggbbbbxxxx).with_colortable(table)
}

impl Bus for CityconSystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("citycon: unmapped read 0x{addr:04X}");
            return 0;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::Ram => self.ram[offs],
            Region::VideoRam => self.videoram[offs],
            Region::CharLookup => self.charlookup[offs],
            Region::SpriteRam => self.spriteram[offs],
            Region::Scroll => self.scroll[offs],
            Region::Palette => self.palette_r(offs),
            Region::Rom => self.rom[offs],
            Region::Background | Region::SoundLatch | Region::SoundLatch2 => 0xFF,
            Region::Watchdog => 0,
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("citycon: unmapped write 0x{addr:04X} = 0x{data:02X}");
            return;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::Ram => self.ram[offs] = data,
            Region::VideoRam => self.videoram_w(offs, data),
            Region::CharLookup => self.charlookup_w(offs, data),
            Region::SpriteRam => self.spriteram[offs] = data,
            Region::Background => self.background_w(data),
            Region::SoundLatch => self.sound_latch[0] = data,
            Region::SoundLatch2 => self.sound_latch[1] = data,
            Region::Scroll => self.scroll[offs] = data,
            Region::Palette => self.palette_w(offs, data),
            Region::Watchdog | Region::Rom => {}
        }
    }
}

impl Machine for CityconSystem {
    fn display_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn visible_area(&self) -> Rect {
        VISIBLE
    }

    fn palette(&self) -> &Palette {
        &self.palette
    }

    fn gfx(&self) -> &[GfxElement] {
        &self.gfx
    }

    fn refresh(&mut self, bitmap: &mut Bitmap, full_refresh: bool) {
        self.recalc_palette(full_refresh);

        if self.bg_dirty {
            self.bg_dirty = false;
            self.draw_background();
        }
        let clip = bitmap.bounds();
        let half = self.scroll_value() >> 1;
        let bg_scroll = if self.flip_screen { 256 + half } else { -half };
        copy_scroll_bitmap(bitmap, &self.bg_bitmap, &[bg_scroll], &[], &clip, Transparency::Opaque);

        self.draw_text_layer();
        let rows = self.text_row_scroll();
        copy_scroll_bitmap(bitmap, &self.fg_bitmap, &rows, &[], &clip, Transparency::Color(0));

        self.draw_sprites(bitmap, &clip);
    }

    fn bus_read(&mut self, master: BusMaster, addr: u32) -> u16 {
        self.read(master, addr as u16) as u16
    }

    fn bus_write(&mut self, master: BusMaster, addr: u32, data: u16, _mem_mask: u16) {
        self.write(master, addr as u16, data as u8);
    }
}

// ---------------------------------------------------------------------------
// Machine registry
// ---------------------------------------------------------------------------

fn create_machine(regions: &RomRegions) -> Result<Box<dyn Machine>, MachineError> {
    Ok(Box::new(CityconSystem::new(regions)?))
}

inventory::submit! {
    MachineEntry::new("citycon", "City Connection", &CITYCON_REGIONS, create_machine)
}
