use marquee_core::core::machine::Machine;
use marquee_core::core::{AddressMap, Bus, BusMaster};
use marquee_core::video::palette::fixed;
use marquee_core::video::{
    Bitmap, DirtyCells, GfxDraw, GfxElement, GfxLayout, Palette, Rect, Transparency,
    copy_scroll_bitmap, draw_gfx, rgn_frac,
};

use crate::regions::{MachineError, RegionSpec, RomRegions};
use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Regions and graphics layouts
// ---------------------------------------------------------------------------

pub static BLUEPRNT_REGIONS: [RegionSpec; 3] = [
    RegionSpec::optional("cpu1", 0x5000),
    RegionSpec::required("gfx1", 0x2000),
    RegionSpec::required("gfx2", 0x3000),
];

static X8: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
static Y8: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];
static Y16: [u32; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 72, 80, 88, 96, 104, 112, 120,
];
static CHAR_PLANES: [u32; 2] = [rgn_frac(0, 2), rgn_frac(1, 2)];
static SPRITE_PLANES: [u32; 3] = [rgn_frac(2, 3), rgn_frac(1, 3), rgn_frac(0, 3)];

/// 8×8, 2 planes in separate halves of the region.
pub static CHAR_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 8,
    total: rgn_frac(1, 2),
    plane_offsets: &CHAR_PLANES,
    x_offsets: &X8,
    y_offsets: &Y8,
    char_increment: 64,
};

/// 8×16, 3 planes in separate thirds of the region.
pub static SPRITE_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 16,
    total: rgn_frac(1, 3),
    plane_offsets: &SPRITE_PLANES,
    x_offsets: &X8,
    y_offsets: &Y16,
    char_increment: 128,
};

const SCREEN_WIDTH: u32 = 256;
const SCREEN_HEIGHT: u32 = 256;
const VISIBLE: Rect = Rect::new(0, 255, 16, 239);

const CHAR_COLORS: usize = 128;
const SPRITE_COLOR_BASE: usize = CHAR_COLORS * 4;

// ---------------------------------------------------------------------------
// Memory map
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom,
    Ram,
    VideoRam,
    ScrollRam,
    SpriteRam,
    Input0,
    Input1,
    DipSwitch,
    SoundCommand,
    /// Write: flip screen / character bank. Read: watchdog.
    Control,
    ColorRam,
}

fn memory_map() -> Result<AddressMap<Region>, MachineError> {
    Ok(AddressMap::new(
        0xFFFF,
        [
            (0x0000..=0x4FFF, Region::Rom),
            (0x8000..=0x87FF, Region::Ram),
            // 0x9400-0x97FF mirrors video RAM.
            (0x9000..=0x97FF, Region::VideoRam),
            (0xA000..=0xA0FF, Region::ScrollRam),
            (0xB000..=0xB0FF, Region::SpriteRam),
            (0xC000..=0xC000, Region::Input0),
            (0xC001..=0xC001, Region::Input1),
            (0xC003..=0xC003, Region::DipSwitch),
            (0xD000..=0xD000, Region::SoundCommand),
            (0xE000..=0xE000, Region::Control),
            (0xF000..=0xF3FF, Region::ColorRam),
        ],
    )?)
}

/// Blue Print (Jaleco, 1982)
///
/// Hardware: Z80 main CPU, Z80 + 2×AY-3-8910 sound board (not emulated here).
/// Video: 32×32 character layer with per-column scroll, 8×16 sprites, and
/// characters flagged in colour RAM bit 7 redrawn over the sprites.
/// Palette: 16 fixed pens; character colours are composed from two 3-bit
/// codes, the fourth pen of each colour being their bitwise OR.
///
/// ```text
/// 0000-4FFF  program ROM
/// 8000-87FF  work RAM
/// 9000-93FF  video RAM (mirrored at 9400)
/// A000-A0FF  column scroll RAM
/// B000-B0FF  sprite RAM, 4 bytes per sprite
/// C000/C001  inputs
/// C003       sound board DIP switch readback
/// D000       sound command (write)
/// E000       W: bit 1 low = flip screen, bit 2 = character bank. R: watchdog
/// F000-F3FF  colour RAM
/// ```
pub struct BlueprntSystem {
    map: AddressMap<Region>,
    rom: Vec<u8>,
    ram: [u8; 0x800],
    videoram: [u8; 0x400],
    colorram: [u8; 0x400],
    scrollram: [u8; 0x100],
    spriteram: [u8; 0x100],

    dirty: DirtyCells,
    tmpbitmap: Bitmap,
    gfx: Vec<GfxElement>,
    palette: Palette,

    flip_screen: bool,
    gfx_bank: usize,
    sound_command: u8,
    dipsw: u8,
}

impl BlueprntSystem {
    pub fn new(regions: &RomRegions) -> Result<Self, MachineError> {
        let rom = regions.load(&BLUEPRNT_REGIONS[0])?;
        let gfx1 = regions.load(&BLUEPRNT_REGIONS[1])?;
        let gfx2 = regions.load(&BLUEPRNT_REGIONS[2])?;

        let gfx = vec![
            GfxElement::decode(&CHAR_LAYOUT, &gfx1, 0, CHAR_COLORS),
            GfxElement::decode(&SPRITE_LAYOUT, &gfx2, SPRITE_COLOR_BASE, 1),
        ];
        log::debug!(
            "blueprnt: decoded {} chars, {} sprites",
            gfx[0].total(),
            gfx[1].total()
        );

        Ok(Self {
            map: memory_map()?,
            rom,
            ram: [0; 0x800],
            videoram: [0; 0x400],
            colorram: [0; 0x400],
            scrollram: [0; 0x100],
            spriteram: [0; 0x100],
            dirty: DirtyCells::try_new(0x400)?,
            tmpbitmap: Bitmap::try_new(SCREEN_WIDTH as usize, SCREEN_HEIGHT as usize)?,
            gfx,
            palette: build_palette(),
            flip_screen: false,
            gfx_bank: 0,
            sound_command: 0,
            dipsw: 0,
        })
    }

    pub fn sound_command(&self) -> u8 {
        self.sound_command
    }

    /// Value the sound board last latched for the DIP switch readback port.
    pub fn set_dipsw(&mut self, data: u8) {
        self.dipsw = data;
    }

    pub fn is_cell_dirty(&self, offs: usize) -> bool {
        self.dirty.is_dirty(offs)
    }

    fn videoram_w(&mut self, offs: usize, data: u8) {
        if self.videoram[offs] != data {
            self.videoram[offs] = data;
            self.dirty.mark(offs);
        }
    }

    fn colorram_w(&mut self, offs: usize, data: u8) {
        if self.colorram[offs] != data {
            self.colorram[offs] = data;
            self.dirty.mark(offs);
        }
    }

    fn control_w(&mut self, data: u8) {
        let flip = !data & 2 != 0;
        if self.flip_screen != flip {
            self.flip_screen = flip;
            self.dirty.mark_all();
        }
        let bank = ((data & 4) >> 2) as usize;
        if self.gfx_bank != bank {
            self.gfx_bank = bank;
            self.dirty.mark_all();
        }
    }

    fn cell_position(&self, offs: usize) -> (i32, i32) {
        let (sx, sy) = ((offs % 32) as i32, (offs / 32) as i32);
        if self.flip_screen {
            (31 - sx, 31 - sy)
        } else {
            (sx, sy)
        }
    }

    fn char_draw(&self, offs: usize, x: i32, y: i32) -> GfxDraw {
        GfxDraw::new(
            self.videoram[offs] as usize + 256 * self.gfx_bank,
            (self.colorram[offs] & 0x7F) as usize,
            x,
            y,
        )
        .flipped(self.flip_screen, self.flip_screen)
    }

    fn column_scroll(&self) -> [i32; 32] {
        let mut scroll = [0i32; 32];
        if self.flip_screen {
            for i in 0..32 {
                scroll[31 - i] = self.scrollram[32 - i] as i32;
            }
        } else {
            for (i, s) in scroll.iter_mut().enumerate() {
                *s = -(self.scrollram[30 - i] as i32);
            }
        }
        scroll
    }
}

/// 16 pens: bit 0 red, bit 2 green, bit 1 blue, bit 3 dims all three.
/// Characters use four entries per colour code, sprites the last 8.
fn build_palette() -> Palette {
    let mut palette = Palette::new(16, fixed);
    for i in 0..16usize {
        let level = if i & 8 != 0 { 0xBF } else { 0xFF };
        let on = |bit: usize| if (i >> bit) & 1 != 0 { level } else { 0 };
        palette.set_rgb(i, (on(0), on(2), on(1)));
    }

    let mut table = Vec::with_capacity(SPRITE_COLOR_BASE + 8);
    for i in 0..CHAR_COLORS as u16 {
        let base = if i & 0x40 != 0 { 0 } else { 8 };
        let a = i & 7;
        let b = (i >> 3) & 7;
        table.extend_from_slice(&[base, base + a, base + b, base + (a | b)]);
    }
    table.extend(8..16u16);
    palette.with_colortable(table)
}

impl Bus for BlueprntSystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("blueprnt: unmapped read 0x{addr:04X}");
            return 0;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::Rom => self.rom[offs],
            Region::Ram => self.ram[offs],
            Region::VideoRam => self.videoram[offs & 0x3FF],
            Region::ScrollRam => self.scrollram[offs],
            Region::SpriteRam => self.spriteram[offs],
            Region::Input0 | Region::Input1 => 0,
            Region::DipSwitch => self.dipsw,
            Region::ColorRam => self.colorram[offs],
            Region::SoundCommand | Region::Control => 0,
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("blueprnt: unmapped write 0x{addr:04X} = 0x{data:02X}");
            return;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::Ram => self.ram[offs] = data,
            Region::VideoRam => self.videoram_w(offs & 0x3FF, data),
            Region::ScrollRam => self.scrollram[offs] = data,
            Region::SpriteRam => self.spriteram[offs] = data,
            Region::SoundCommand => {
                log::trace!("blueprnt: sound command 0x{data:02X}");
                self.sound_command = data;
            }
            Region::Control => self.control_w(data),
            Region::ColorRam => self.colorram_w(offs, data),
            Region::Rom | Region::Input0 | Region::Input1 | Region::DipSwitch => {}
        }
    }
}

impl Machine for BlueprntSystem {
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
        if full_refresh {
            self.dirty.mark_all();
        }
        let full = bitmap.bounds();

        for offs in (0..0x400).rev() {
            if !self.dirty.take(offs) {
                continue;
            }
            let (sx, sy) = self.cell_position(offs);
            let d = self.char_draw(offs, 8 * sx, 8 * sy);
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

        let scroll = self.column_scroll();
        copy_scroll_bitmap(bitmap, &self.tmpbitmap, &[], &scroll, &full, Transparency::Opaque);

        for offs in (0..0x100).step_by(4) {
            let s = &self.spriteram;
            let mut sx = s[offs + 3] as i32;
            let mut sy = 240 - s[offs] as i32;
            let mut flip_x = s[offs + 2] & 0x40 != 0;
            // The Y flip bit comes from the previous sprite's attribute byte.
            let mut flip_y = s[(offs + 0x100 - 2) & 0xFF] & 0x80 != 0;
            if self.flip_screen {
                sx = 248 - sx;
                sy = 240 - sy;
                flip_x = !flip_x;
                flip_y = !flip_y;
            }
            let d = GfxDraw::new(s[offs + 1] as usize, 0, 2 + sx, sy - 1).flipped(flip_x, flip_y);
            draw_gfx(bitmap, &self.gfx[1], &self.palette, &d, &full, Transparency::Pen(0));
        }

        for offs in (0..0x400).rev() {
            if self.colorram[offs] & 0x80 == 0 {
                continue;
            }
            let (sx, sy) = self.cell_position(offs);
            let y = (8 * sy + scroll[sx as usize]) & 0xFF;
            let d = self.char_draw(offs, 8 * sx, y);
            draw_gfx(bitmap, &self.gfx[0], &self.palette, &d, &full, Transparency::Pen(0));
        }
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
    Ok(Box::new(BlueprntSystem::new(regions)?))
}

inventory::submit! {
    MachineEntry::new("blueprnt", "Blue Print", &BLUEPRNT_REGIONS, create_machine)
}
