use marquee_core::core::machine::Machine;
use marquee_core::core::{AddressMap, Bus, BusMaster};
use marquee_core::device::WipingSound;
use marquee_core::device::wiping_sound::SAMPLE_RATE;
use marquee_core::video::palette::fixed;
use marquee_core::video::{
    Bitmap, DirtyCells, GfxDraw, GfxElement, GfxLayout, Palette, Rect, Transparency,
    copy_bitmap, draw_gfx,
};

use crate::regions::{MachineError, RegionSpec, RomRegions};
use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Regions and graphics layouts
// ---------------------------------------------------------------------------

pub static WIPING_REGIONS: [RegionSpec; 7] = [
    RegionSpec::optional("cpu1", 0x6000),
    RegionSpec::optional("cpu2", 0x2000),
    RegionSpec::required("gfx1", 0x2000),
    RegionSpec::required("gfx2", 0x2000),
    // 32 palette bytes, then char and sprite lookup tables.
    RegionSpec::required("proms", 0x220),
    // One-shot samples.
    RegionSpec::required("sound1", 0x4000),
    // Looping waveforms.
    RegionSpec::required("sound2", 0x200),
];

static PLANES: [u32; 2] = [0, 4];
static X8: [u32; 8] = [0, 1, 2, 3, 64, 65, 66, 67];
static Y8: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];
static X16: [u32; 16] = [
    0, 1, 2, 3, 64, 65, 66, 67, 128, 129, 130, 131, 192, 193, 194, 195,
];
static Y16: [u32; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 256, 264, 272, 280, 288, 296, 304, 312,
];

pub static CHAR_LAYOUT: GfxLayout = GfxLayout {
    width: 8,
    height: 8,
    total: 512,
    plane_offsets: &PLANES,
    x_offsets: &X8,
    y_offsets: &Y8,
    char_increment: 16 * 8,
};

pub static SPRITE_LAYOUT: GfxLayout = GfxLayout {
    width: 16,
    height: 16,
    total: 128,
    plane_offsets: &PLANES,
    x_offsets: &X16,
    y_offsets: &Y16,
    char_increment: 64 * 8,
};

const SCREEN_WIDTH: u32 = 288;
const SCREEN_HEIGHT: u32 = 224;

const COLORS: usize = 64;
const SPRITE_COLOR_BASE: usize = COLORS * 4;

/// Main CPU.
const MAIN_CPU: usize = 0;

// ---------------------------------------------------------------------------
// Memory maps
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom,
    VideoRam,
    ColorRam,
    SpriteRam,
    Shared1,
    Shared2,
    /// A000-A007 latches: 0 irq enable, 2 flip, 3 sound CPU reset.
    Latches,
    Inputs,
    Watchdog,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SoundRegion {
    Rom,
    Sound,
    Shared1,
    Shared2,
    IrqEnable,
}

fn main_map() -> Result<AddressMap<Region>, MachineError> {
    Ok(AddressMap::new(
        0xFFFF,
        [
            (0x0000..=0x5FFF, Region::Rom),
            (0x8000..=0x83FF, Region::VideoRam),
            (0x8400..=0x87FF, Region::ColorRam),
            (0x8800..=0x8BFF, Region::SpriteRam),
            (0x9000..=0x93FF, Region::Shared1),
            (0x9800..=0x9BFF, Region::Shared2),
            (0xA000..=0xA007, Region::Latches),
            (0xA800..=0xA807, Region::Inputs),
            (0xB000..=0xB000, Region::Watchdog),
        ],
    )?)
}

fn sound_map() -> Result<AddressMap<SoundRegion>, MachineError> {
    Ok(AddressMap::new(
        0xFFFF,
        [
            (0x0000..=0x1FFF, SoundRegion::Rom),
            (0x4000..=0x7FFF, SoundRegion::Sound),
            (0x9000..=0x93FF, SoundRegion::Shared1),
            (0x9800..=0x9BFF, SoundRegion::Shared2),
            (0xA001..=0xA001, SoundRegion::IrqEnable),
        ],
    )?)
}

/// Screen cell for video RAM offset `offs`. The two leftmost and two
/// rightmost columns of the monitor are stored in the rows at either end of
/// the 32×32 RAM layout.
pub fn cell_position(offs: usize, flip: bool) -> (i32, i32) {
    let mx = (offs % 32) as i32;
    let my = (offs / 32) as i32;
    let (sx, sy) = if my < 2 {
        (my + 34, mx - 2)
    } else if my >= 30 {
        (my - 30, mx - 2)
    } else {
        (mx + 2, my - 2)
    };
    if flip { (35 - sx, 27 - sy) } else { (sx, sy) }
}

/// Wiping (Nichibutsu, 1982)
///
/// Hardware: two Z80s (main and sound) sharing two 1 KB RAM blocks, and a
/// custom 8-voice 4-bit wavetable sound chip driven by the sound CPU.
/// Video: 36×28 character playfield in the Namco arrangement, 16×16 sprites,
/// characters with colour bit 7 set redrawn over sprites. Palette from a
/// 32-byte PROM, colours through lookup PROMs.
///
/// Main CPU:
/// ```text
/// 0000-5FFF  program ROM
/// 8000-83FF  video RAM
/// 8400-87FF  colour RAM (bit 7: priority and char code bit 8)
/// 8800-8BFF  sprite RAM; code/colour at +0, Y/X at +100, X bit 8 at +80
/// 9000-93FF  shared RAM 1
/// 9800-9BFF  shared RAM 2
/// A000       interrupt enable
/// A002       flip screen
/// A003       sound CPU reset
/// A800-A807  inputs
/// B000       watchdog
/// ```
///
/// Sound CPU:
/// ```text
/// 0000-1FFF  program ROM
/// 4000-7FFF  sound chip registers
/// 9000-93FF  shared RAM 1
/// 9800-9BFF  shared RAM 2
/// A001       interrupt enable
/// ```
pub struct WipingSystem {
    map: AddressMap<Region>,
    sound_map: AddressMap<SoundRegion>,
    rom: Vec<u8>,
    sound_rom: Vec<u8>,
    videoram: Vec<u8>,
    colorram: Vec<u8>,
    spriteram: Vec<u8>,
    shared1: Vec<u8>,
    shared2: Vec<u8>,

    dirty: DirtyCells,
    tmpbitmap: Bitmap,
    gfx: Vec<GfxElement>,
    palette: Palette,
    sound: WipingSound,

    flip_screen: bool,
    main_irq_enable: bool,
    sound_irq_enable: bool,
    sound_cpu_reset: bool,
}

impl WipingSystem {
    pub fn new(regions: &RomRegions) -> Result<Self, MachineError> {
        let rom = regions.load(&WIPING_REGIONS[0])?;
        let sound_rom = regions.load(&WIPING_REGIONS[1])?;
        let gfx1 = regions.load(&WIPING_REGIONS[2])?;
        let gfx2 = regions.load(&WIPING_REGIONS[3])?;
        let proms = regions.load(&WIPING_REGIONS[4])?;
        let samples = regions.load(&WIPING_REGIONS[5])?;
        let waves = regions.load(&WIPING_REGIONS[6])?;

        let gfx = vec![
            GfxElement::decode(&CHAR_LAYOUT, &gfx1, 0, COLORS),
            GfxElement::decode(&SPRITE_LAYOUT, &gfx2, SPRITE_COLOR_BASE, COLORS),
        ];
        log::debug!(
            "wiping: decoded {} chars, {} sprites",
            gfx[0].total(),
            gfx[1].total()
        );

        Ok(Self {
            map: main_map()?,
            sound_map: sound_map()?,
            rom,
            sound_rom,
            videoram: vec![0; 0x400],
            colorram: vec![0; 0x400],
            spriteram: vec![0; 0x400],
            shared1: vec![0; 0x400],
            shared2: vec![0; 0x400],
            dirty: DirtyCells::try_new(0x400)?,
            tmpbitmap: Bitmap::try_new(SCREEN_WIDTH as usize, SCREEN_HEIGHT as usize)?,
            gfx,
            palette: build_palette(&proms),
            sound: WipingSound::new(&samples, &waves),
            flip_screen: false,
            main_irq_enable: false,
            sound_irq_enable: false,
            sound_cpu_reset: false,
        })
    }

    pub fn sound(&self) -> &WipingSound {
        &self.sound
    }

    pub fn is_cell_dirty(&self, offs: usize) -> bool {
        self.dirty.is_dirty(offs)
    }

    /// Whether the main CPU holds the sound CPU in reset.
    pub fn sound_cpu_in_reset(&self) -> bool {
        self.sound_cpu_reset
    }

    pub fn irq_enabled(&self, cpu: usize) -> bool {
        if cpu == MAIN_CPU {
            self.main_irq_enable
        } else {
            self.sound_irq_enable
        }
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

    fn latch_w(&mut self, offs: usize, data: u8) {
        let bit = data & 1 != 0;
        match offs {
            0 => self.main_irq_enable = bit,
            2 => {
                if self.flip_screen != bit {
                    self.flip_screen = bit;
                    self.dirty.mark_all();
                }
            }
            3 => {
                // Active low. The chip stays silent while its CPU is held.
                self.sound_cpu_reset = !bit;
                self.sound.set_enabled(bit);
                log::trace!("wiping: sound CPU reset {}", self.sound_cpu_reset);
            }
            _ => {}
        }
    }

    fn char_draw(&self, offs: usize) -> GfxDraw {
        let (sx, sy) = cell_position(offs, self.flip_screen);
        let color = self.colorram[offs];
        GfxDraw::new(
            self.videoram[offs] as usize | ((color as usize & 0x80) << 1),
            (color & 0x3F) as usize,
            8 * sx,
            8 * sy,
        )
        .flipped(self.flip_screen, self.flip_screen)
    }

    fn draw_sprites(&self, bitmap: &mut Bitmap, clip: &Rect) {
        // Front to back in list order so the vacuum cleaner stays on top.
        let s = &self.spriteram;
        for offs in (0..128).step_by(2) {
            let mut sx = s[offs + 0x101] as i32 + ((s[offs + 0x81] as i32 & 1) << 8) - 40;
            let mut sy = 224 - s[offs + 0x100] as i32;
            let mut flip_x = s[offs] & 0x80 != 0;
            let mut flip_y = s[offs] & 0x40 != 0;
            if self.flip_screen {
                sx = SCREEN_WIDTH as i32 - 16 - sx;
                sy = SCREEN_HEIGHT as i32 - 16 - sy;
                flip_x = !flip_x;
                flip_y = !flip_y;
            }
            let code = (s[offs] & 0x3F) as usize + 64 * (s[offs + 0x80] & 1) as usize;
            let color = (s[offs + 1] & 0x3F) as usize;
            let d = GfxDraw::new(code, color, sx, sy).flipped(flip_x, flip_y);
            draw_gfx(bitmap, &self.gfx[1], &self.palette, &d, clip, Transparency::Color(0));
        }
    }

    fn sound_read(&mut self, addr: u16) -> u8 {
        let Some(m) = self.sound_map.resolve(addr as u32) else {
            log::trace!("wiping: sound CPU unmapped read 0x{addr:04X}");
            return 0;
        };
        let offs = m.offset as usize;
        match m.handler {
            SoundRegion::Rom => self.sound_rom[offs],
            SoundRegion::Shared1 => self.shared1[offs],
            SoundRegion::Shared2 => self.shared2[offs],
            SoundRegion::Sound | SoundRegion::IrqEnable => 0,
        }
    }

    fn sound_write(&mut self, addr: u16, data: u8) {
        let Some(m) = self.sound_map.resolve(addr as u32) else {
            log::trace!("wiping: sound CPU unmapped write 0x{addr:04X} = 0x{data:02X}");
            return;
        };
        let offs = m.offset as usize;
        match m.handler {
            SoundRegion::Sound => self.sound.write(offs as u16, data),
            SoundRegion::Shared1 => self.shared1[offs] = data,
            SoundRegion::Shared2 => self.shared2[offs] = data,
            SoundRegion::IrqEnable => self.sound_irq_enable = data & 1 != 0,
            SoundRegion::Rom => {}
        }
    }
}

/// 32 pens from the palette PROM (3 bits red, 3 green, 2 blue), then 256
/// char and 256 sprite lookups, each group of four stored in reverse.
fn build_palette(proms: &[u8]) -> Palette {
    let mut palette = Palette::new(32, fixed);
    for (i, &p) in proms[..32].iter().enumerate() {
        let bit = |n: u8| (p >> n) & 1;
        let weigh = |b0: u8, b1: u8, b2: u8| 0x21 * b0 + 0x47 * b1 + 0x97 * b2;
        let r = weigh(bit(0), bit(1), bit(2));
        let g = weigh(bit(3), bit(4), bit(5));
        let b = weigh(0, bit(6), bit(7));
        palette.set_rgb(i, (r, g, b));
    }

    let mut table = vec![0u16; 2 * SPRITE_COLOR_BASE];
    for i in 0..SPRITE_COLOR_BASE {
        table[i ^ 3] = (proms[32 + i] & 0x0F) as u16;
        table[SPRITE_COLOR_BASE + (i ^ 3)] = (proms[32 + SPRITE_COLOR_BASE + i] & 0x0F) as u16 + 0x10;
    }
    palette.mark_all_used();
    palette.with_colortable(table)
}

impl Bus for WipingSystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, master: BusMaster, addr: u16) -> u8 {
        let BusMaster::Cpu(cpu) = master;
        if cpu != MAIN_CPU {
            return self.sound_read(addr);
        }
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("wiping: unmapped read 0x{addr:04X}");
            return 0;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::Rom => self.rom[offs],
            Region::VideoRam => self.videoram[offs],
            Region::ColorRam => self.colorram[offs],
            Region::SpriteRam => self.spriteram[offs],
            Region::Shared1 => self.shared1[offs],
            Region::Shared2 => self.shared2[offs],
            Region::Inputs => 0xFF,
            Region::Latches | Region::Watchdog => 0,
        }
    }

    fn write(&mut self, master: BusMaster, addr: u16, data: u8) {
        let BusMaster::Cpu(cpu) = master;
        if cpu != MAIN_CPU {
            self.sound_write(addr, data);
            return;
        }
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("wiping: unmapped write 0x{addr:04X} = 0x{data:02X}");
            return;
        };
        let offs = m.offset as usize;
        match m.handler {
            Region::VideoRam => self.videoram_w(offs, data),
            Region::ColorRam => self.colorram_w(offs, data),
            Region::SpriteRam => self.spriteram[offs] = data,
            Region::Shared1 => self.shared1[offs] = data,
            Region::Shared2 => self.shared2[offs] = data,
            Region::Latches => self.latch_w(offs, data),
            Region::Rom | Region::Inputs | Region::Watchdog => {}
        }
    }
}

impl Machine for WipingSystem {
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
        if full_refresh {
            self.dirty.mark_all();
        }

        // Offset 0 is never drawn on the real board either.
        for offs in (1..0x400).rev() {
            if !self.dirty.take(offs) {
                continue;
            }
            let d = self.char_draw(offs);
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
        copy_bitmap(bitmap, &self.tmpbitmap, 0, 0, &clip, Transparency::Opaque);
        self.draw_sprites(bitmap, &clip);

        for offs in (1..0x400).rev() {
            if self.colorram[offs] & 0x80 == 0 {
                continue;
            }
            let d = self.char_draw(offs);
            draw_gfx(bitmap, &self.gfx[0], &self.palette, &d, &clip, Transparency::Color(0));
        }
    }

    fn bus_read(&mut self, master: BusMaster, addr: u32) -> u16 {
        self.read(master, addr as u16) as u16
    }

    fn bus_write(&mut self, master: BusMaster, addr: u32, data: u16, _mem_mask: u16) {
        self.write(master, addr as u16, data as u8);
    }

    fn fill_audio(&mut self, buffer: &mut [i16]) -> usize {
        self.sound.update(buffer);
        buffer.len()
    }

    fn audio_sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

// ---------------------------------------------------------------------------
// Machine registry
// ---------------------------------------------------------------------------

fn create_machine(regions: &RomRegions) -> Result<Box<dyn Machine>, MachineError> {
    Ok(Box::new(WipingSystem::new(regions)?))
}

inventory::submit! {
    MachineEntry::new("wiping", "Wiping", &WIPING_REGIONS, create_machine)
}
