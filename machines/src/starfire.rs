use marquee_core::core::machine::Machine;
use marquee_core::core::{AddressMap, Bus, BusMaster};
use marquee_core::device::StarfireVideo;
use marquee_core::video::palette::fixed;
use marquee_core::video::{Bitmap, GfxElement, Palette, Rect, Transparency, copy_bitmap};

use crate::regions::{MachineError, RegionSpec, RomRegions};
use crate::registry::MachineEntry;

pub static STARFIRE_REGIONS: [RegionSpec; 1] = [RegionSpec::optional("cpu1", 0x5800)];

const SCREEN_WIDTH: u32 = 256;
const SCREEN_HEIGHT: u32 = 256;
const VISIBLE: Rect = Rect::new(0, 255, 32, 255);
const LINES: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom,
    Scratch,
    ColorRam,
    VideoRam,
}

fn memory_map() -> Result<AddressMap<Region>, MachineError> {
    Ok(AddressMap::new(
        0xFFFF,
        [
            (0x0000..=0x57FF, Region::Rom),
            (0x8000..=0x9FFF, Region::Scratch),
            (0xA000..=0xBFFF, Region::ColorRam),
            (0xC000..=0xFFFF, Region::VideoRam),
        ],
    )?)
}

/// Scratch RAM offsets alias scattered video RAM bytes.
fn scratch_to_videoram(offset: u16) -> u16 {
    (offset & 0x31F) | ((offset & 0xE0) << 5)
}

/// Starfire (Exidy, 1979)
///
/// Hardware: Z80, discrete sound (not emulated). Video: a 256×256 bitmap
/// with 5 bits of colour per 8-pixel byte, written through the shifter/ALU
/// in [`StarfireVideo`]. The palette is 64 pens set by colour RAM writes to
/// the pseudo-palette area; pen bit 5 is the pixel bit, bits 0-4 the colour.
///
/// ```text
/// 0000-57FF  program ROM
/// 8000-9FFF  scratch RAM, aliased into video RAM
///            (A12 set, A3 clear: 0 = vidctrl, 1 = vidctrl1, 2 = sound;
///             reads with A11 set return inputs)
/// A000-BFFF  colour RAM
/// C000-FFFF  video RAM through the shifter; C000-DFFF and E000-FFFF use
///            the two nibbles of vidctrl
/// ```
pub struct StarfireSystem {
    map: AddressMap<Region>,
    rom: Vec<u8>,
    video: StarfireVideo,
    screen: Bitmap,
    palette: Palette,
    /// First scanline not yet materialized this frame.
    next_line: usize,
    sound_control: u8,
}

impl StarfireSystem {
    pub fn new(regions: &RomRegions) -> Result<Self, MachineError> {
        let rom = regions.load(&STARFIRE_REGIONS[0])?;
        let mut palette = Palette::new(64, fixed);
        palette.mark_all_used();
        log::debug!("starfire: video RAM ready");

        Ok(Self {
            map: memory_map()?,
            rom,
            video: StarfireVideo::new(),
            screen: Bitmap::try_new(SCREEN_WIDTH as usize, SCREEN_HEIGHT as usize)?,
            palette,
            next_line: 0,
            sound_control: 0,
        })
    }

    pub fn video(&self) -> &StarfireVideo {
        &self.video
    }

    pub fn sound_control(&self) -> u8 {
        self.sound_control
    }

    /// Materialize every line from `next_line` up to (not including) `end`.
    fn flush_to(&mut self, end: usize) {
        if end < self.next_line {
            self.video
                .video_update(self.next_line, LINES - self.next_line, &mut self.screen);
            self.next_line = 0;
        }
        self.video
            .video_update(self.next_line, end - self.next_line, &mut self.screen);
        self.next_line = end % LINES;
    }

    fn scratch_w(&mut self, offset: u16, data: u8) {
        if offset & 0x1008 == 0x1000 {
            match offset & 7 {
                0 => self.video.set_vidctrl(data),
                1 => self.video.set_vidctrl1(data),
                2 => {
                    log::trace!("starfire: sound control 0x{data:02X}");
                    self.sound_control = data;
                }
                _ => {}
            }
        }
        self.video.poke(scratch_to_videoram(offset), data);
    }

    fn scratch_r(&self, offset: u16) -> u8 {
        if offset & 0x800 != 0 {
            return 0xFF;
        }
        self.video.peek(scratch_to_videoram(offset))
    }
}

impl Bus for StarfireSystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("starfire: unmapped read 0x{addr:04X}");
            return 0;
        };
        let offs = m.offset as u16;
        match m.handler {
            Region::Rom => self.rom[offs as usize],
            Region::Scratch => self.scratch_r(offs),
            Region::ColorRam => self.video.colorram_read(offs),
            Region::VideoRam => self.video.read(offs),
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let Some(m) = self.map.resolve(addr as u32) else {
            log::trace!("starfire: unmapped write 0x{addr:04X} = 0x{data:02X}");
            return;
        };
        let offs = m.offset as u16;
        match m.handler {
            Region::Scratch => self.scratch_w(offs, data),
            Region::ColorRam => self.video.colorram_write(offs, data, &mut self.palette),
            Region::VideoRam => self.video.write(offs, data),
            Region::Rom => {}
        }
    }
}

impl Machine for StarfireSystem {
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
        &[]
    }

    fn tick(&mut self, scanline: u16) {
        self.flush_to(scanline as usize % LINES);
    }

    fn refresh(&mut self, bitmap: &mut Bitmap, full_refresh: bool) {
        if full_refresh {
            self.video.mark_all_dirty();
            self.next_line = 0;
        }
        self.flush_to(LINES);
        let clip = bitmap.bounds();
        copy_bitmap(bitmap, &self.screen, 0, 0, &clip, Transparency::Opaque);
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
    Ok(Box::new(StarfireSystem::new(regions)?))
}

inventory::submit! {
    MachineEntry::new("starfire", "Starfire", &STARFIRE_REGIONS, create_machine)
}
