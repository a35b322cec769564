use crate::core::bus::BusMaster;
use crate::video::{Bitmap, GfxElement, Palette, Rect};

/// Board-agnostic interface to one emulated arcade board instance.
///
/// Each board (Blue Print, Starfire, etc.) owns all of its state: RAM
/// blocks, dirty flags, persistent off-screen bitmaps, palette and sound
/// voices. Several instances can coexist; nothing is shared between them.
///
/// The CPU cores, input wiring and frame timing live outside this crate. The
/// host drives a board through three kinds of calls:
/// - bus accesses (`bus_read` / `bus_write`), in the exact order its CPU
///   cores issue them,
/// - `refresh` once per displayed frame,
/// - `fill_audio` whenever its audio device wants more samples.
pub trait Machine {
    /// Size of the composited screen bitmap as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Portion of the screen bitmap that is shown on the monitor.
    fn visible_area(&self) -> Rect;

    /// Current palette (pens and colour table).
    fn palette(&self) -> &Palette;

    /// Decoded graphics sets, in the board's gfx numbering.
    fn gfx(&self) -> &[GfxElement];

    /// Compose one complete frame into `bitmap` (pen values).
    ///
    /// `bitmap` must be `display_size()` large. `full_refresh` forces every
    /// cached cell to be redrawn, as after a state load or a host-side
    /// invalidation.
    fn refresh(&mut self, bitmap: &mut Bitmap, full_refresh: bool);

    /// The beam has reached `scanline`. Boards that materialize video RAM
    /// incrementally flush everything up to this line; others ignore it.
    fn tick(&mut self, _scanline: u16) {}

    /// Bus read from the given CPU. 8-bit boards return the byte in the low
    /// half of the result.
    fn bus_read(&mut self, master: BusMaster, addr: u32) -> u16;

    /// Bus write from the given CPU. `mem_mask` marks the data bits that are
    /// driven; 8-bit boards ignore it and use the low byte of `data`.
    fn bus_write(&mut self, master: BusMaster, addr: u32, data: u16, mem_mask: u16);

    /// Fill `buffer` with mono samples. Returns the number of samples written,
    /// which is `buffer.len()` for boards with sound emulation and 0 otherwise.
    fn fill_audio(&mut self, _buffer: &mut [i16]) -> usize {
        0
    }

    /// Native output rate of `fill_audio`, or 0 when the board has no sound.
    fn audio_sample_rate(&self) -> u32 {
        0
    }

    /// Convert the visible area of `bitmap` into an RGB24 buffer using the
    /// current palette. `buffer` must hold `width * height * 3` bytes of the
    /// visible area.
    fn render_frame(&self, bitmap: &Bitmap, buffer: &mut [u8]) {
        bitmap.to_rgb24(self.palette(), &self.visible_area(), buffer);
    }
}
