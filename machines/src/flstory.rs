use marquee_core::core::machine::Machine;
use marquee_core::core::{AddressMap, Bus, BusMaster};
use marquee_core::video::palette::xxxxbbbbggggrrrr;
use marquee_core::video::{
    Bitmap, DirtyCells, GfxDraw, GfxElement, GfxLayout, Palette, Rect, Transparency,
    copy_scroll_bitmap, draw_gfx, rgn_frac,
};

use crate::regions::{MachineError, RegionSpec, RomRegions};
use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Regions and graphics layouts
// ---------------------------------------------------------------------------

pub static FLSTORY_REGIONS: [RegionSpec; 2] = [
    RegionSpec::optional("cpu1", 0xC000),
    RegionSpec::required("gfx1", 0x20000),
];

static PLANES: [u32; 4] = [rgn_frac(1, 2), rgn_frac(1, 2) + 4, 0, 4];
static X8: [u32; 8] = [3, 2, 1, 0, 8 + 3, 8 + 2, 8 + 1, 8];
static Y8: [u32; 8] = [0, 16, 32, 48, 64, 80, 96, 112];
static X16: [u32; 16] = [
    3,
    2,
    1,
    0,
    8 + 3,
    8 + 2,
    8 + 1,
    8,
    128 + 3,
    128 + 2,
    128 + 1,
    128,
    128 + 8 + 3,
    128 + 8 + 2,
    128 + 8 + 1,
    128 + 8,
];
static Y16: [u32; 16] = [
    0, 16, 32, 48, 64, 80, 96, 112, 256, 272, 288, 304, 320, 336, 352, 368,
];

/// 8×8, 4bpp; two planes per byte pair in each half of the region.
pub static CHAR_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 8,
    total: rgn_frac(1, 2),
    plane_offsets: &PLANES,
    x_offsets: &X8,
    y_offsets: &Y8,
    char_increment: 16 * 8,
};

/// 16×16 sprites over the same ROMs as the characters.
pub static SPRITE_LAYOUT: GfxLayout = GfxLayout {
    width: 16,
    height: 16,
    total: rgn_frac(1, 2),
    plane_offsets: &PLANES,
    x_offsets: &X16,
    y_offsets: &Y16,
    char_increment: 64 * 8,
};

const SCREEN_WIDTH: u32 = 256;
const SCREEN_HEIGHT: u32 = 256;
const VISIBLE: Rect = Rect::new(0, 255, 16, 239);

const SPRITE_COLOR_BASE: usize = 256;
const SPRITE_SLOTS: usize = 0x20;
const SPRITERAM_SIZE: usize = 0xA0;

/// Values the sound handshake ports read back. The game only checks for
/// these constants.
const SOUND_FLAG_D400: u8 = 0x14;
const SOUND_FLAG_D401: u8 = 0xEF;

// ---------------------------------------------------------------------------
// Memory map
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom,
    VideoRam,
    Mcu,
    SoundHandshake,
    Inputs,
    SpriteRam,
    ScrollRam,
    Palette,
    GfxCtrl,
    Ram,
}

fn memory_map() -> Result<AddressMap<Region>, MachineError> {
    Ok(AddressMap::new(
        0xFFFF,
        [
            (0x0000..=0xBFFF, Region::Rom),
            (0xC000..=0xC7FF, Region::VideoRam),
            (0xD000..=0xD000, Region::Mcu),
            (0xD400..=0xD401, Region::SoundHandshake),
            (0xD800..=0xD805, Region::Inputs),
            (0xDC00..=0xDC9F, Region::SpriteRam),
            (0xDCA0..=0xDCBF, Region::ScrollRam),
            (0xDD00..=0xDEFF, Region::Palette),
            (0xDF03..=0xDF03, Region::GfxCtrl),
            (0xE000..=0xE7FF, Region::Ram),
        ],
    )?)
}

/// Attribute byte of a text cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellAttr(u8);

impl CellAttr {
    fn color(self) -> usize {
        (self.0 & 0x0F) as usize
    }

    fn flip_x(self) -> bool {
        self.0 & 0x08 != 0
    }

    fn flip_y(self) -> bool {
        self.0 & 0x10 != 0
    }

    fn priority(self) -> bool {
        self.0 & 0x20 != 0
    }

    fn code_high(self) -> usize {
        ((self.0 & 0xC0) as usize) << 2
    }
}

/// The Fairyland Story (Taito, 1985)
///
/// Hardware: Z80 main CPU, Z80 sound CPU with AY-3-8910 and MSM5232, 68705
/// protection MCU (none emulated). Video: 32×32 text layer with per-column
/// scroll, 16×16 sprites drawn in two passes around the priority cells.
/// Palette RAM is written a byte page at a time: low bytes at DD00-DDFF,
/// high bytes at DE00-DEFF, with a bank bit in the graphics control register
/// selecting which 256 colours the window addresses.
///
/// ```text
/// 0000-BFFF  program ROM
/// C000-C7FF  video RAM, 2 bytes per cell (code, attribute)
/// D000       MCU data
/// D400/D401  sound command (write), sound handshake flags (read)
/// D800-D805  inputs
/// DC00-DC9F  sprite RAM, 4 bytes per sprite + 32-byte draw order list
/// DCA0-DCBF  column scroll
/// DD00-DEFF  palette RAM, xxxxBBBBGGGGRRRR split across two pages
/// DF03       bit 0 low = flip, bit 4 char bank, bit 5 palette bank
/// E000-E7FF  work RAM
/// ```
pub struct FlstorySystem {
    map: AddressMap<Region>,
    rom: Vec<u8>,
    ram: Vec<u8>,
    videoram: Vec<u8>,
    spriteram: [u8; SPRITERAM_SIZE],
    scrollram: [u8; 0x20],

    dirty: DirtyCells,
    tmpbitmap: Bitmap,
    gfx: Vec<GfxElement>,
    palette: Palette,

    gfxctrl: Option<u8>,
    flip_screen: bool,
    char_bank: usize,
    palette_bank: usize,
    sound_command: u8,
}

impl FlstorySystem {
    pub fn new(regions: &RomRegions) -> Result<Self, MachineError> {
        let rom = regions.load(&FLSTORY_REGIONS[0])?;
        let gfx1 = regions.load(&FLSTORY_REGIONS[1])?;

        let gfx = vec![
            GfxElement::decode(&CHAR_LAYOUT, &gfx1, 0, 16),
            GfxElement::decode(&SPRITE_LAYOUT, &gfx1, SPRITE_COLOR_BASE, 16),
        ];
        log::debug!(
            "flstory: decoded {} chars, {} sprites",
            gfx[0].total(),
            gfx[1].total()
        );

        Ok(Self {
            map: memory_map()?,
            rom,
            ram: vec![0; 0x800],
            videoram: vec![0; 0x800],
            spriteram: [0; SPRITERAM_SIZE],
            scrollram: [0; 0x20],
            dirty: DirtyCells::try_new(0x400)?,
            tmpbitmap: Bitmap::try_new(SCREEN_WIDTH as usize, SCREEN_HEIGHT as usize)?,
            gfx,
            palette: Palette::new(512, xxxxbbbbggggrrrr),
            gfxctrl: None,
            flip_screen: false,
            char_bank: 0,
            palette_bank: 0,
            sound_command: 0,
        })
    }

    pub fn sound_command(&self) -> u8 {
        self.sound_command
    }

    pub fn is_cell_dirty(&self, cell: usize) -> bool {
        self.dirty.is_dirty(cell)
    }

    pub fn recalc_palette(&mut self, full_refresh: bool) -> bool {
        self.mark_palette_usage();
        let invalidate = self.palette.recalc() || full_refresh;
        if invalidate {
            self.dirty.mark_all();
        }
        invalidate
    }

    pub fn palette_bank(&self) -> usize {
        self.palette_bank
    }

    fn videoram_w(&mut self, offs: usize, data: u8) {
        if self.videoram[offs] != data {
            self.videoram[offs] = data;
            self.dirty.mark(offs / 2);
        }
    }

    fn palette_w(&mut self, offs: usize, data: u8) {
        let pen = (offs & 0xFF) + (self.palette_bank << 8);
        if offs & 0x100 != 0 {
            self.palette.write_split_hi(pen, data);
        } else {
            self.palette.write_split_lo(pen, data);
        }
    }

    fn palette_r(&self, offs: usize) -> u8 {
        let raw = self.palette.raw((offs & 0xFF) + (self.palette_bank << 8));
        if offs & 0x100 != 0 {
            (raw >> 8) as u8
        } else {
            raw as u8
        }
    }

    fn gfxctrl_w(&mut self, data: u8) {
        if self.gfxctrl == Some(data) {
            return;
        }
        self.gfxctrl = Some(data);
        log::trace!("flstory: gfxctrl 0x{data:02X}");

        let flip = data & 0x01 == 0;
        let bank = ((data & 0x10) >> 4) as usize;
        if self.flip_screen != flip || self.char_bank != bank {
            self.flip_screen = flip;
            self.char_bank = bank;
            self.dirty.mark_all();
        }
        self.palette_bank = ((data & 0x20) >> 5) as usize;
    }

    fn cell(&self, cell: usize) -> (usize, CellAttr) {
        let attr = CellAttr(self.videoram[cell * 2 + 1]);
        let code = self.videoram[cell * 2] as usize + attr.code_high() + 0x400 + 0x800 * self.char_bank;
        (code, attr)
    }

    fn cell_draw(&self, cell: usize, y_offset: impl Fn(i32, i32) -> i32) -> GfxDraw {
        let (code, attr) = self.cell(cell);
        let (mut sx, mut sy) = ((cell % 32) as i32, (cell / 32) as i32);
        let (mut flip_x, mut flip_y) = (attr.flip_x(), attr.flip_y());
        if self.flip_screen {
            sx = 31 - sx;
            sy = 31 - sy;
            flip_x = !flip_x;
            flip_y = !flip_y;
        }
        GfxDraw::new(code, attr.color(), 8 * sx, y_offset(sx, sy)).flipped(flip_x, flip_y)
    }

    fn column_scroll(&self) -> [i32; 32] {
        let mut scroll = [0i32; 32];
        for (i, &s) in self.scrollram.iter().enumerate() {
            if self.flip_screen {
                scroll[31 - i] = s as i32;
            } else {
                scroll[i] = -(s as i32);
            }
        }
        scroll
    }

    fn mark_palette_usage(&mut self) {
        self.palette.clear_all_used();
        for cell in 0..0x400 {
            let (code, attr) = self.cell(cell);
            self.palette.mark_gfx_used(&self.gfx[0], code, attr.color());
        }
        for offs in (0..SPRITE_SLOTS * 4).step_by(4) {
            let attr = self.spriteram[offs + 1];
            let code = self.spriteram[offs + 2] as usize + (((attr & 0x30) as usize) << 4);
            self.palette
                .mark_gfx_used(&self.gfx[1], code, (attr & 0x0F) as usize);
        }
    }

    /// Draw the sprites whose order-list entry has bit 7 equal to `priority`.
    fn draw_sprites(&self, bitmap: &mut Bitmap, clip: &Rect, priority: u8) {
        for i in 0..SPRITE_SLOTS {
            let pr = self.spriteram[SPRITERAM_SIZE - 1 - i];
            if pr & 0x80 != priority {
                continue;
            }
            let offs = (pr & 0x1F) as usize * 4;
            let s = &self.spriteram[offs..offs + 4];
            let code = s[2] as usize + (((s[1] & 0x30) as usize) << 4);
            let mut sx = s[3] as i32;
            let sy = if self.flip_screen {
                sx = (240 - sx) & 0xFF;
                s[0] as i32 - 1
            } else {
                240 - s[0] as i32 - 1
            };
            let flip_x = (s[1] & 0x40 != 0) ^ self.flip_screen;
            let flip_y = (s[1] & 0x80 != 0) ^ self.flip_screen;
            let color = (s[1] & 0x0F) as usize;

            let d = GfxDraw::new(code, color, sx, sy).flipped(flip_x, flip_y);
            draw_gfx(bitmap, &self.gfx[1], &self.palette, &d, clip, Transparency::Pen(15));
            // Wrap around the left edge.
            if sx > 240 {
                let d = GfxDraw { x: sx - 256, ..d };
                draw_gfx(bitmap, &self.gfx[1], &self.palette, &d, clip, Transparency::Pen(15));
            }
        }
    }
}

impl Bus for FlstorySystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("flstory: unmapped read 0x{addr:04X}");
            return 0;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::Rom => self.rom[offs],
            Region::VideoRam => self.videoram[offs],
            Region::SoundHandshake => {
                if offs == 0 {
                    SOUND_FLAG_D400
                } else {
                    SOUND_FLAG_D401
                }
            }
            Region::Inputs => 0xFF,
            Region::SpriteRam => self.spriteram[offs],
            Region::ScrollRam => self.scrollram[offs],
            Region::Palette => self.palette_r(offs),
            Region::Ram => self.ram[offs],
            Region::Mcu | Region::GfxCtrl => 0,
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("flstory: unmapped write 0x{addr:04X} = 0x{data:02X}");
            return;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::VideoRam => self.videoram_w(offs, data),
            Region::SoundHandshake => {
                log::trace!("flstory: sound command 0x{data:02X}");
                self.sound_command = data;
            }
            Region::SpriteRam => self.spriteram[offs] = data,
            Region::ScrollRam => self.scrollram[offs] = data,
            Region::Palette => self.palette_w(offs, data),
            Region::GfxCtrl => self.gfxctrl_w(data),
            Region::Ram => self.ram[offs] = data,
            Region::Rom | Region::Mcu | Region::Inputs => {}
        }
    }
}

impl Machine for FlstorySystem {
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

        for cell in (0..0x400).rev() {
            if !self.dirty.take(cell) {
                continue;
            }
            let d = self.cell_draw(cell, |_, sy| 8 * sy);
            let clip = self.tmpbitmap.bounds();
            draw_gfx(
                &mut self.tmpbitmap,
                &self.gfx[0],
                &self.palette,
                &d,
                &clip,
                Transparency::Opaque,
            );
        }

        let clip = bitmap.bounds();
        let scroll = self.column_scroll();
        copy_scroll_bitmap(bitmap, &self.tmpbitmap, &[], &scroll, &clip, Transparency::Opaque);

        self.draw_sprites(bitmap, &clip, 0x00);

        for cell in (0..0x400).rev() {
            if !self.cell(cell).1.priority() {
                continue;
            }
            let d = self.cell_draw(cell, |sx, sy| (8 * sy + scroll[sx as usize]) & 0xFF);
            draw_gfx(bitmap, &self.gfx[0], &self.palette, &d, &clip, Transparency::Pen(15));
        }

        self.draw_sprites(bitmap, &clip, 0x80);
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
    Ok(Box::new(FlstorySystem::new(regions)?))
}

inventory::submit! {
    MachineEntry::new("flstory", "The Fairyland Story", &FLSTORY_REGIONS, create_machine)
}
