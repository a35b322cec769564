use marquee_core::core::machine::Machine;
use marquee_core::core::{AddressMap, Bus, BusMaster, combine_word};
use marquee_core::video::palette::xxxxbbbbggggrrrr;
use marquee_core::video::tilemap::scan_rows;
use marquee_core::video::{
    Bitmap, GfxDraw, GfxElement, GfxLayout, Palette, Rect, TileInfo, Tilemap, Transparency,
    draw_gfx, rgn_frac,
};

use crate::regions::{MachineError, RegionSpec, RomRegions};
use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Regions and graphics layouts
// ---------------------------------------------------------------------------

pub static SUPBTIME_REGIONS: [RegionSpec; 3] = [
    RegionSpec::optional("cpu1", 0x40000),
    RegionSpec::required("gfx1", 0x80000),
    RegionSpec::required("gfx2", 0x100000),
];

static TILE_PLANES: [u32; 4] = [rgn_frac(1, 2) + 8, rgn_frac(1, 2), 8, 0];
static SPRITE_PLANES: [u32; 4] = [24, 8, 16, 0];
static X8: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
static Y8_WORDS: [u32; 8] = [0, 16, 32, 48, 64, 80, 96, 112];
static X16_TILE: [u32; 16] = [
    256, 257, 258, 259, 260, 261, 262, 263, 0, 1, 2, 3, 4, 5, 6, 7,
];
static Y16_WORDS: [u32; 16] = [
    0, 16, 32, 48, 64, 80, 96, 112, 128, 144, 160, 176, 192, 208, 224, 240,
];
static X16_SPRITE: [u32; 16] = [
    512, 513, 514, 515, 516, 517, 518, 519, 0, 1, 2, 3, 4, 5, 6, 7,
];
static Y16_LONGS: [u32; 16] = [
    0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 480,
];

pub static CHAR_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 8,
    total: 4096,
    plane_offsets: &TILE_PLANES,
    x_offsets: &X8,
    y_offsets: &Y8_WORDS,
    char_increment: 16 * 8,
};

/// 16×16 tiles share the character ROMs; the right half comes first.
pub static TILE_LAYOUT: GfxLayout = GfxLayout {
    width: 16,
    height: 16,
    total: 4096,
    plane_offsets: &TILE_PLANES,
    x_offsets: &X16_TILE,
    y_offsets: &Y16_WORDS,
    char_increment: 64 * 8,
};

pub static SPRITE_LAYOUT: GfxLayout = GfxLayout {
    width: 16,
    height: 16,
    total: 4096 * 2,
    plane_offsets: &SPRITE_PLANES,
    x_offsets: &X16_SPRITE,
    y_offsets: &Y16_LONGS,
    char_increment: 32 * 32,
};

const SCREEN_WIDTH: u32 = 320;
const SCREEN_HEIGHT: u32 = 256;
const VISIBLE: Rect = Rect::new(0, 319, 8, 247);

const SPRITE_COLOR_BASE: usize = 0;
const PF1_COLOR_BASE: usize = 256;
const PF2_COLOR_BASE: usize = 512;
/// Pen shown where no layer draws.
const BACKGROUND_PEN: u16 = 768;

const PF_CELLS: usize = 64 * 32;
const SPRITE_WORDS: usize = 0x400;

/// 16×16 playfield: two 32×32 pages side by side.
fn scan_pf2(col: usize, row: usize, _cols: usize, _rows: usize) -> usize {
    (col & 0x1F) + ((row & 0x1F) << 5) + ((col & 0x20) << 5)
}

/// Mask the 9-bit sprite position and wrap it into signed screen space
/// (x past 320 and y past 256 come in from the other edge).
pub fn wrap_sprite_position(x: u16, y: u16) -> (i32, i32) {
    let mut x = (x & 0x1FF) as i32;
    let mut y = (y & 0x1FF) as i32;
    if x >= 320 {
        x -= 512;
    }
    if y >= 256 {
        y -= 512;
    }
    (x, y)
}

// ---------------------------------------------------------------------------
// Memory map
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom,
    Ram,
    SpriteRam,
    Palette,
    Inputs,
    Sound,
    Control,
    Pf1Data,
    Pf2Data,
}

fn memory_map() -> Result<AddressMap<Region>, MachineError> {
    Ok(AddressMap::new(
        0x00FF_FFFF,
        [
            (0x000000..=0x03FFFF, Region::Rom),
            (0x100000..=0x103FFF, Region::Ram),
            (0x120000..=0x1207FF, Region::SpriteRam),
            (0x140000..=0x1407FF, Region::Palette),
            (0x180000..=0x18000F, Region::Inputs),
            (0x1A0000..=0x1A0001, Region::Sound),
            (0x300000..=0x30000F, Region::Control),
            (0x320000..=0x320FFF, Region::Pf1Data),
            (0x322000..=0x322FFF, Region::Pf2Data),
        ],
    )?)
}

/// One decoded DECO sprite list entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DecoSprite {
    code: usize,
    color: usize,
    x: i32,
    y: i32,
    flip_x: bool,
    flip_y: bool,
    flash: bool,
    /// Extra cells stacked vertically: 0, 1, 3 or 7.
    multi: i32,
}

impl DecoSprite {
    fn from_words(w: &[u16]) -> Option<Self> {
        let code = (w[1] & 0x3FFF) as usize;
        if code == 0 {
            return None;
        }
        let (x, y) = wrap_sprite_position(w[2], w[0]);
        Some(Self {
            code,
            color: ((w[2] >> 9) & 0x1F) as usize,
            x,
            y,
            flip_x: w[0] & 0x2000 != 0,
            flip_y: w[0] & 0x4000 != 0,
            flash: w[0] & 0x1000 != 0,
            multi: (1 << ((w[0] & 0x0600) >> 9)) - 1,
        })
    }
}

/// Super Burger Time (Data East, 1990)
///
/// Hardware: 68000, HuC6280 sound CPU with YM2151 and OKI6295 (not
/// emulated). Video: DECO 16IC-style playfields, an 8×8 foreground and a
/// 16×16 background, each 64×32 tiles with XY scroll, under one flip bit,
/// plus DECO sprites of 1, 2, 4 or 8 cells stacked vertically.
///
/// ```text
/// 000000-03FFFF  program ROM
/// 100000-103FFF  work RAM
/// 120000-1207FF  sprite RAM, 4 words per sprite
/// 140000-1407FF  palette RAM, xxxxBBBBGGGGRRRR, 1024 colours
/// 180000-18000F  inputs
/// 1A0000         sound command
/// 300000-30000F  control: w0 bit 7 flip, w1/w2 pf1 scroll x/y, w3/w4 pf2 scroll x/y
/// 320000-320FFF  playfield 1 (8×8), 1 word per tile
/// 322000-322FFF  playfield 2 (16×16), 1 word per tile
/// ```
pub struct SupbtimeSystem {
    map: AddressMap<Region>,
    rom: Vec<u8>,
    ram: Vec<u16>,
    spriteram: Vec<u16>,
    pf1_data: Vec<u16>,
    pf2_data: Vec<u16>,
    control: [u16; 8],

    pf1: Tilemap,
    pf2: Tilemap,
    gfx: Vec<GfxElement>,
    palette: Palette,

    frame: u64,
    sound_command: u8,
}

impl SupbtimeSystem {
    pub fn new(regions: &RomRegions) -> Result<Self, MachineError> {
        let rom = regions.load(&SUPBTIME_REGIONS[0])?;
        let gfx1 = regions.load(&SUPBTIME_REGIONS[1])?;
        let gfx2 = regions.load(&SUPBTIME_REGIONS[2])?;

        let gfx = vec![
            GfxElement::decode(&CHAR_LAYOUT, &gfx1, PF1_COLOR_BASE, 16),
            GfxElement::decode(&TILE_LAYOUT, &gfx1, PF2_COLOR_BASE, 16),
            GfxElement::decode(&SPRITE_LAYOUT, &gfx2, SPRITE_COLOR_BASE, 16),
        ];
        log::debug!(
            "supbtime: decoded {} chars, {} tiles, {} sprites",
            gfx[0].total(),
            gfx[1].total(),
            gfx[2].total()
        );

        Ok(Self {
            map: memory_map()?,
            rom,
            ram: vec![0; 0x2000],
            spriteram: vec![0; SPRITE_WORDS],
            pf1_data: vec![0; PF_CELLS],
            pf2_data: vec![0; PF_CELLS],
            control: [0; 8],
            pf1: Tilemap::try_new(64, 32, 8, 8, scan_rows, Some(0))?,
            pf2: Tilemap::try_new(64, 32, 16, 16, scan_pf2, None)?,
            gfx,
            palette: Palette::new(1024, xxxxbbbbggggrrrr),
            frame: 0,
            sound_command: 0,
        })
    }

    pub fn sound_command(&self) -> u8 {
        self.sound_command
    }

    pub fn is_pf1_dirty(&self, index: usize) -> bool {
        self.pf1.is_dirty(index)
    }

    pub fn is_pf2_dirty(&self, index: usize) -> bool {
        self.pf2.is_dirty(index)
    }

    /// Both playfields are redrawn when the used-pen set changes.
    pub fn recalc_palette(&mut self, full_refresh: bool) -> bool {
        self.mark_palette_usage();
        let invalidate = self.palette.recalc() || full_refresh;
        if invalidate {
            self.pf1.mark_all_dirty();
            self.pf2.mark_all_dirty();
        }
        invalidate
    }

    fn flip_screen(&self) -> bool {
        self.control[0] & 0x80 != 0
    }

    fn pf1_w(&mut self, index: usize, data: u16, mem_mask: u16) {
        let old = self.pf1_data[index];
        let new = combine_word(old, data, mem_mask);
        if old != new {
            self.pf1_data[index] = new;
            self.pf1.mark_tile_dirty(index);
        }
    }

    fn pf2_w(&mut self, index: usize, data: u16, mem_mask: u16) {
        let old = self.pf2_data[index];
        let new = combine_word(old, data, mem_mask);
        if old != new {
            self.pf2_data[index] = new;
            self.pf2.mark_tile_dirty(index);
        }
    }

    fn sprites(&self) -> impl Iterator<Item = DecoSprite> + '_ {
        self.spriteram
            .chunks_exact(4)
            .filter_map(DecoSprite::from_words)
    }

    fn mark_palette_usage(&mut self) {
        self.palette.clear_all_used();
        self.palette.mark_used(BACKGROUND_PEN);
        for &w in &self.pf1_data {
            self.palette
                .mark_gfx_used(&self.gfx[0], (w & 0xFFF) as usize, (w >> 12) as usize);
        }
        for &w in &self.pf2_data {
            self.palette
                .mark_gfx_used(&self.gfx[1], (w & 0xFFF) as usize, (w >> 12) as usize);
        }
        let colors: Vec<usize> = self.sprites().map(|s| s.color).collect();
        for color in colors {
            self.palette.mark_color_used(&self.gfx[2], color);
        }
    }

    fn draw_sprites(&self, bitmap: &mut Bitmap, clip: &Rect) {
        let flip = self.flip_screen();
        for s in self.sprites() {
            if s.flash && self.frame & 1 != 0 {
                continue;
            }
            let mut y = 240 - s.y;
            let mut x = 304 - s.x;
            if x > 320 {
                continue;
            }

            let mut code = s.code & !(s.multi as usize);
            let inc: i32 = if s.flip_y {
                -1
            } else {
                code += s.multi as usize;
                1
            };

            let (mut flip_x, mut flip_y) = (s.flip_x, s.flip_y);
            let mult = if flip {
                y = 240 - y;
                x = 304 - x;
                flip_x = !flip_x;
                flip_y = !flip_y;
                16
            } else {
                -16
            };

            let mut multi = s.multi;
            while multi >= 0 {
                let cell = (code as i32 - multi * inc) as usize;
                let d = GfxDraw::new(cell, s.color, x, y + mult * multi).flipped(flip_x, flip_y);
                draw_gfx(bitmap, &self.gfx[2], &self.palette, &d, clip, Transparency::Pen(0));
                multi -= 1;
            }
        }
    }
}

impl Bus for SupbtimeSystem {
    type Address = u32;
    type Data = u16;

    fn read(&mut self, _master: BusMaster, addr: u32) -> u16 {
        let Some(m) = self.map.resolve(addr) else {
            log::trace!("supbtime: unmapped read 0x{addr:06X}");
            return 0;
        };
        let word = (m.offset / 2) as usize;
        match m.handler {
            Region::Rom => {
                let i = word * 2;
                u16::from_be_bytes([self.rom[i], self.rom[i + 1]])
            }
            Region::Ram => self.ram[word],
            Region::SpriteRam => self.spriteram[word],
            Region::Palette => self.palette.raw(word),
            Region::Inputs => 0xFFFF,
            Region::Control => self.control[word],
            Region::Pf1Data => self.pf1_data[word],
            Region::Pf2Data => self.pf2_data[word],
            Region::Sound => 0,
        }
    }

    fn write(&mut self, master: BusMaster, addr: u32, data: u16) {
        self.write_masked(master, addr, data, 0xFFFF);
    }

    fn write_masked(&mut self, _master: BusMaster, addr: u32, data: u16, mem_mask: u16) {
        let Some(m) = self.map.resolve(addr) else {
            log::trace!("supbtime: unmapped write 0x{addr:06X} = 0x{data:04X}");
            return;
        };
        let word = (m.offset / 2) as usize;
        match m.handler {
            Region::Ram => self.ram[word] = combine_word(self.ram[word], data, mem_mask),
            Region::SpriteRam => {
                self.spriteram[word] = combine_word(self.spriteram[word], data, mem_mask)
            }
            Region::Palette => self.palette.write_word(word, data, mem_mask),
            Region::Sound => {
                if mem_mask & 0x00FF != 0 {
                    log::trace!("supbtime: sound command 0x{:02X}", data as u8);
                    self.sound_command = data as u8;
                }
            }
            Region::Control => {
                self.control[word] = combine_word(self.control[word], data, mem_mask)
            }
            Region::Pf1Data => self.pf1_w(word, data, mem_mask),
            Region::Pf2Data => self.pf2_w(word, data, mem_mask),
            Region::Rom | Region::Inputs => {}
        }
    }
}

impl Machine for SupbtimeSystem {
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
        let flip = self.flip_screen();
        for pf in [&mut self.pf1, &mut self.pf2] {
            pf.set_flip(flip);
        }
        self.pf1.set_scroll_x(self.control[1] as i32);
        self.pf1.set_scroll_y(self.control[2] as i32);
        self.pf2.set_scroll_x(self.control[3] as i32);
        self.pf2.set_scroll_y(self.control[4] as i32);

        self.recalc_palette(full_refresh);

        let pf1_data = &self.pf1_data;
        self.pf1.update(&self.gfx, &self.palette, |i| TileInfo {
            gfx: 0,
            code: (pf1_data[i] & 0xFFF) as usize,
            color: (pf1_data[i] >> 12) as usize,
            ..TileInfo::default()
        });
        let pf2_data = &self.pf2_data;
        self.pf2.update(&self.gfx, &self.palette, |i| TileInfo {
            gfx: 1,
            code: (pf2_data[i] & 0xFFF) as usize,
            color: (pf2_data[i] >> 12) as usize,
            ..TileInfo::default()
        });

        let clip = bitmap.bounds();
        bitmap.fill(BACKGROUND_PEN);
        self.pf2.draw(bitmap, &clip);
        self.draw_sprites(bitmap, &clip);
        self.pf1.draw(bitmap, &clip);

        self.frame += 1;
    }

    fn bus_read(&mut self, master: BusMaster, addr: u32) -> u16 {
        self.read(master, addr)
    }

    fn bus_write(&mut self, master: BusMaster, addr: u32, data: u16, mem_mask: u16) {
        self.write_masked(master, addr, data, mem_mask);
    }
}

// ---------------------------------------------------------------------------
// Machine registry
// ---------------------------------------------------------------------------

fn create_machine(regions: &RomRegions) -> Result<Box<dyn Machine>, MachineError> {
    Ok(Box::new(SupbtimeSystem::new(regions)?))
}

inventory::submit! {
    MachineEntry::new("supbtime", "Super Burger Time", &SUPBTIME_REGIONS, create_machine)
}
