use marquee_core::core::machine::Machine;
use marquee_core::core::{AddressMap, Bus, BusMaster, combine_word};
use marquee_core::video::descramble::{descramble_bytes, descramble_words};
use marquee_core::video::palette::rrrrggggbbbbrgbx;
use marquee_core::video::{
    Bitmap, DirtyCells, GfxDraw, GfxElement, GfxLayout, Palette, Rect, Transparency,
    copy_bitmap, draw_gfx, rgn_frac,
};

use crate::regions::{MachineError, RegionSpec, RomRegions};
use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

pub static BJTWIN_REGIONS: [RegionSpec; 5] = [
    RegionSpec::optional("cpu1", 0x80000),
    RegionSpec::required("gfx1", 0x10000),
    RegionSpec::required("gfx2", 0x100000),
    RegionSpec::required("gfx3", 0x100000),
    RegionSpec::optional("sound1", 0x140000),
];

// ---------------------------------------------------------------------------
// Graphics ROM descrambling
// ---------------------------------------------------------------------------

/// Bit permutations for the background tile ROMs, chosen by
/// [`bg_table_select`].
pub static BG_DECODE: [[u8; 8]; 8] = [
    [0x3, 0x0, 0x7, 0x2, 0x5, 0x1, 0x4, 0x6],
    [0x1, 0x2, 0x6, 0x5, 0x4, 0x0, 0x3, 0x7],
    [0x7, 0x6, 0x5, 0x4, 0x3, 0x2, 0x1, 0x0],
    [0x7, 0x6, 0x5, 0x0, 0x1, 0x4, 0x3, 0x2],
    [0x2, 0x0, 0x1, 0x4, 0x3, 0x5, 0x7, 0x6],
    [0x5, 0x3, 0x7, 0x0, 0x4, 0x6, 0x1, 0x2],
    [0x2, 0x7, 0x0, 0x6, 0x5, 0x3, 0x1, 0x4],
    [0x2, 0x7, 0x0, 0x6, 0x5, 0x3, 0x1, 0x4],
];

/// Bit permutations for the sprite ROM words, chosen by
/// [`sprite_table_select`].
pub static SPRITE_DECODE: [[u8; 16]; 4] = [
    [0x9, 0x3, 0x4, 0x5, 0x7, 0x1, 0xb, 0x8, 0x0, 0xd, 0x2, 0xc, 0xe, 0x6, 0xf, 0xa],
    [0x1, 0x3, 0xc, 0x4, 0x0, 0xf, 0xb, 0xa, 0x8, 0x5, 0xe, 0x6, 0xd, 0x2, 0x7, 0x9],
    [0xf, 0xe, 0xd, 0xc, 0xb, 0xa, 0x9, 0x8, 0x7, 0x6, 0x5, 0x4, 0x3, 0x2, 0x1, 0x0],
    [0xf, 0xe, 0xc, 0x6, 0xa, 0xb, 0x7, 0x8, 0x9, 0x2, 0x3, 0x4, 0x5, 0xd, 0x1, 0x0],
];

/// Address lines 2, 11 and 18 pick the background permutation.
pub fn bg_table_select(a: u32) -> usize {
    (((a & 0x00004) >> 2) | ((a & 0x00800) >> 10) | ((a & 0x40000) >> 16)) as usize
}

/// Address lines 4 and 17 pick the sprite permutation.
pub fn sprite_table_select(a: u32) -> usize {
    (((a & 0x00010) >> 4) | ((a & 0x20000) >> 16)) as usize
}

/// The sample ROM's bank headers carry address bits the OKI chips cannot
/// use. Clear them: in the first 0x400 bytes of every 0x10000 bank, bytes
/// +0 and +3 of each 8-byte entry.
pub fn fix_sound_rom(rom: &mut [u8]) {
    for bank in rom.chunks_mut(0x10000) {
        let header = bank.len().min(0x400);
        for entry in bank[..header].chunks_mut(8) {
            entry[0] = 0;
            if let Some(b) = entry.get_mut(3) {
                *b = 0;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Graphics layouts
// ---------------------------------------------------------------------------

static PLANES_4: [u32; 4] = [0, 1, 2, 3];
static X8_NIBBLES: [u32; 8] = [0, 4, 8, 12, 16, 20, 24, 28];
static Y8_WORDS: [u32; 8] = [0, 32, 64, 96, 128, 160, 192, 224];
static X16_NIBBLES: [u32; 16] = [
    0, 4, 8, 12, 16, 20, 24, 28, 512, 516, 520, 524, 528, 532, 536, 540,
];
static Y16_WORDS: [u32; 16] = [
    0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 480,
];

/// 8×8, 4bpp packed nibbles, 32 bytes per tile.
pub static CHAR_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 8,
    total: rgn_frac(1, 1),
    plane_offsets: &PLANES_4,
    x_offsets: &X8_NIBBLES,
    y_offsets: &Y8_WORDS,
    char_increment: 32 * 8,
};

/// 16×16, 4bpp packed nibbles, left half then right half, 128 bytes each.
pub static SPRITE_LAYOUT: GfxLayout = GfxLayout {
    width: 16,
    height: 16,
    total: rgn_frac(1, 1),
    plane_offsets: &PLANES_4,
    x_offsets: &X16_NIBBLES,
    y_offsets: &Y16_WORDS,
    char_increment: 32 * 32,
};

const SCREEN_WIDTH: u32 = 384;
const SCREEN_HEIGHT: u32 = 224;
/// Raster lines above the visible area; both layers are shifted up by it.
const Y_OFFSET: i32 = 16;
/// Rightmost visible text column. The map is 64 columns wide, but a flipped
/// screen mirrors against the 48 that are shown.
const LAST_VISIBLE_COLUMN: i32 = SCREEN_WIDTH as i32 / 8 - 1;

const TX_CELLS: usize = 0x800;
const SPRITE_BASE: usize = 0x8000;
const SPRITE_BYTES: usize = 0x1000;

// ---------------------------------------------------------------------------
// Memory map
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom,
    Inputs,
    Oki,
    Palette,
    Flip,
    BgBank,
    TextRam,
    Ram,
}

fn memory_map() -> Result<AddressMap<Region>, MachineError> {
    Ok(AddressMap::new(
        0x00FF_FFFF,
        [
            (0x000000..=0x07FFFF, Region::Rom),
            (0x080000..=0x08000F, Region::Inputs),
            (0x084000..=0x08401F, Region::Oki),
            (0x088000..=0x0887FF, Region::Palette),
            (0x094000..=0x094001, Region::Flip),
            (0x094002..=0x094003, Region::BgBank),
            // 0x09D000 mirrors the text layer.
            (0x09C000..=0x09DFFF, Region::TextRam),
            (0x0F0000..=0x0FFFFF, Region::Ram),
        ],
    )?)
}

/// Which of the two 8×8 sets a text-layer word selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileBank {
    /// Fixed character ROM, code = bits 0-10.
    Chars,
    /// Banked background ROM, code = bits 0-10 + bank register × 0x800.
    Background,
}

/// A decoded text-layer word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextTile {
    pub bank: TileBank,
    pub code: usize,
    pub color: usize,
}

impl TextTile {
    pub fn decode(word: u16, bg_bank: u8) -> Self {
        let color = (word >> 12) as usize;
        if word & 0x800 != 0 {
            Self {
                bank: TileBank::Background,
                code: (word & 0x7FF) as usize + ((bg_bank as usize) << 11),
                color,
            }
        } else {
            Self {
                bank: TileBank::Chars,
                code: (word & 0x7FF) as usize,
                color,
            }
        }
    }

    fn gfx_index(&self) -> usize {
        match self.bank {
            TileBank::Chars => 0,
            TileBank::Background => 1,
        }
    }
}

/// One 16-byte NMK16 sprite record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NmkSprite {
    enabled: bool,
    x: i32,
    y: i32,
    code: usize,
    color: usize,
    width: usize,
    height: usize,
}

impl NmkSprite {
    fn from_words(w: &[u16]) -> Self {
        Self {
            enabled: w[0] & 1 != 0,
            width: (w[1] & 0x0F) as usize,
            height: ((w[1] >> 4) & 0x0F) as usize,
            code: w[3] as usize,
            x: (w[4] & 0x1FF) as i32,
            y: (w[6] & 0x1FF) as i32,
            color: w[7] as usize,
        }
    }
}

/// Bombjack Twin (NMK, 1993)
///
/// Hardware: 68000, two OKI6295 sample players (not emulated here; the sample
/// ROM is still fixed up at init). Video: one 64×32 text layer of 8×8 tiles
/// drawing from two sets selected per cell, 16×16 NMK16 sprites built from
/// up to 16×16 cells. Graphics ROMs are bit-scrambled.
///
/// ```text
/// 000000-07FFFF  program ROM
/// 080000-08000F  inputs / DIP switches
/// 084000-08401F  OKI6295 ×2
/// 088000-0887FF  palette RAM, RRRRGGGGBBBBRGBx, 1024 colours
/// 094000         flip screen (bit 0)
/// 094002         background tile bank
/// 09C000-09CFFF  text layer, 1 word per cell, column-major (mirrored at 09D000)
/// 0F0000-0FFFFF  work RAM; sprite list at 0F8000-0F8FFF
/// ```
pub struct BjtwinSystem {
    map: AddressMap<Region>,
    rom: Vec<u8>,
    ram: Vec<u16>,
    txvideoram: Vec<u16>,
    sound_rom: Vec<u8>,

    dirty: DirtyCells,
    background: Bitmap,
    gfx: Vec<GfxElement>,
    palette: Palette,

    flip_screen: bool,
    bg_bank: u8,
}

impl BjtwinSystem {
    pub fn new(regions: &RomRegions) -> Result<Self, MachineError> {
        let rom = regions.load(&BJTWIN_REGIONS[0])?;
        let gfx1 = regions.load(&BJTWIN_REGIONS[1])?;
        let mut gfx2 = regions.load(&BJTWIN_REGIONS[2])?;
        let mut gfx3 = regions.load(&BJTWIN_REGIONS[3])?;
        let mut sound_rom = regions.load(&BJTWIN_REGIONS[4])?;

        descramble_bytes(&mut gfx2, &BG_DECODE, bg_table_select);
        descramble_words(&mut gfx3, &SPRITE_DECODE, sprite_table_select);
        fix_sound_rom(&mut sound_rom);
        log::debug!("bjtwin: graphics ROMs descrambled, sample ROM fixed up");

        let gfx = vec![
            GfxElement::decode(&CHAR_LAYOUT, &gfx1, 0x000, 16),
            GfxElement::decode(&CHAR_LAYOUT, &gfx2, 0x000, 16),
            GfxElement::decode(&SPRITE_LAYOUT, &gfx3, 0x100, 16),
        ];

        Ok(Self {
            map: memory_map()?,
            rom,
            ram: vec![0; 0x8000],
            txvideoram: vec![0; TX_CELLS],
            sound_rom,
            dirty: DirtyCells::try_new(TX_CELLS)?,
            background: Bitmap::try_new(512, 256)?,
            gfx,
            palette: Palette::new(1024, rrrrggggbbbbrgbx),
            flip_screen: false,
            bg_bank: 0,
        })
    }

    /// Sample ROM after the header fixup.
    pub fn sound_rom(&self) -> &[u8] {
        &self.sound_rom
    }

    pub fn is_cell_dirty(&self, offs: usize) -> bool {
        self.dirty.is_dirty(offs)
    }

    /// Rebuild the used-pen set; a changed set or a full refresh
    /// invalidates every text cell. Returns whether it did.
    pub fn recalc_palette(&mut self, full_refresh: bool) -> bool {
        self.mark_palette_usage();
        let invalidate = self.palette.recalc() || full_refresh;
        if invalidate {
            self.dirty.mark_all();
        }
        invalidate
    }

    fn txvideoram_w(&mut self, offs: usize, data: u16, mem_mask: u16) {
        let old = self.txvideoram[offs];
        let new = combine_word(old, data, mem_mask);
        if old != new {
            self.txvideoram[offs] = new;
            self.dirty.mark(offs);
        }
    }

    fn sprite_words(&self, index: usize) -> &[u16] {
        let base = (SPRITE_BASE + index * 16) / 2;
        &self.ram[base..base + 8]
    }

    fn mark_palette_usage(&mut self) {
        self.palette.clear_all_used();
        for offs in 0..TX_CELLS {
            let tile = TextTile::decode(self.txvideoram[offs], self.bg_bank);
            self.palette
                .mark_gfx_used(&self.gfx[tile.gfx_index()], tile.code, tile.color);
        }
        for i in 0..SPRITE_BYTES / 16 {
            let s = NmkSprite::from_words(self.sprite_words(i));
            if s.enabled {
                self.palette.mark_color_used(&self.gfx[2], s.color);
            }
        }
    }

    fn draw_sprites(&self, bitmap: &mut Bitmap, clip: &Rect) {
        for i in 0..SPRITE_BYTES / 16 {
            let s = NmkSprite::from_words(self.sprite_words(i));
            if !s.enabled {
                continue;
            }
            let (mut sx, mut sy, mut delta) = (s.x, s.y, 16);
            if self.flip_screen {
                sx = 368 - sx;
                sy = 240 - sy;
                delta = -16;
            }
            let mut code = s.code;
            for _ in 0..=s.height {
                let mut x = sx;
                for _ in 0..=s.width {
                    let y = ((sy + 16) & 0x1FF) - 16 - Y_OFFSET;
                    let d = GfxDraw::new(code, s.color, ((x + 16) & 0x1FF) - 16, y)
                        .flipped(self.flip_screen, self.flip_screen);
                    draw_gfx(bitmap, &self.gfx[2], &self.palette, &d, clip, Transparency::Pen(15));
                    code += 1;
                    x += delta;
                }
                sy += delta;
            }
        }
    }
}

impl Bus for BjtwinSystem {
    type Address = u32;
    type Data = u16;

    fn read(&mut self, _master: BusMaster, addr: u32) -> u16 {
        let Some(m) = self.map.resolve(addr) else {
            log::trace!("bjtwin: unmapped read 0x{addr:06X}");
            return 0;
        };
        let word = (m.offset / 2) as usize;
        match m.handler {
            Region::Rom => {
                let i = word * 2;
                u16::from_be_bytes([self.rom[i], self.rom[i + 1]])
            }
            Region::Inputs => 0xFFFF,
            Region::Oki => 0,
            Region::Palette => self.palette.raw(word),
            Region::TextRam => self.txvideoram[word % TX_CELLS],
            Region::Ram => self.ram[word],
            Region::Flip | Region::BgBank => 0,
        }
    }

    fn write(&mut self, master: BusMaster, addr: u32, data: u16) {
        self.write_masked(master, addr, data, 0xFFFF);
    }

    fn write_masked(&mut self, _master: BusMaster, addr: u32, data: u16, mem_mask: u16) {
        let Some(m) = self.map.resolve(addr) else {
            log::trace!("bjtwin: unmapped write 0x{addr:06X} = 0x{data:04X}");
            return;
        };
        let word = (m.offset / 2) as usize;
        match m.handler {
            Region::Palette => self.palette.write_word(word, data, mem_mask),
            Region::Flip => {
                if mem_mask & 0x00FF != 0 {
                    let flip = data & 1 != 0;
                    if self.flip_screen != flip {
                        self.flip_screen = flip;
                        self.dirty.mark_all();
                    }
                }
            }
            Region::BgBank => {
                if mem_mask & 0x00FF != 0 {
                    let bank = data as u8;
                    if self.bg_bank != bank {
                        self.bg_bank = bank;
                        self.dirty.mark_all();
                    }
                }
            }
            Region::TextRam => self.txvideoram_w(word % TX_CELLS, data, mem_mask),
            Region::Ram => self.ram[word] = combine_word(self.ram[word], data, mem_mask),
            Region::Rom | Region::Inputs | Region::Oki => {}
        }
    }
}

impl Machine for BjtwinSystem {
    fn display_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn visible_area(&self) -> Rect {
        Rect::new(0, SCREEN_WIDTH as i32 - 1, 0, SCREEN_HEIGHT as i32 - 1)
    }

    fn palette(&self) -> &Palette {
        &self.palette
    }

    fn gfx(&self) -> &[GfxElement] {
        &self.gfx
    }

    fn refresh(&mut self, bitmap: &mut Bitmap, full_refresh: bool) {
        self.recalc_palette(full_refresh);

        for offs in (0..TX_CELLS).rev() {
            if !self.dirty.take(offs) {
                continue;
            }
            let (mut sx, mut sy) = ((offs / 32) as i32, (offs % 32) as i32);
            if self.flip_screen {
                sx = LAST_VISIBLE_COLUMN - sx;
                sy = 31 - sy;
            }
            let tile = TextTile::decode(self.txvideoram[offs], self.bg_bank);
            let d = GfxDraw::new(tile.code, tile.color, 8 * sx, 8 * sy)
                .flipped(self.flip_screen, self.flip_screen);
            let clip = self.background.bounds();
            draw_gfx(
                &mut self.background,
                &self.gfx[tile.gfx_index()],
                &self.palette,
                &d,
                &clip,
                Transparency::Opaque,
            );
        }

        let clip = bitmap.bounds();
        copy_bitmap(bitmap, &self.background, 0, -Y_OFFSET, &clip, Transparency::Opaque);
        self.draw_sprites(bitmap, &clip);
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
    Ok(Box::new(BjtwinSystem::new(regions)?))
}

inventory::submit! {
    MachineEntry::new("bjtwin", "Bombjack Twin", &BJTWIN_REGIONS, create_machine)
}
