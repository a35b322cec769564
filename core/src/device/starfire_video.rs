//! Starfire video RAM with its write-path shifter and 16-function ALU.
//!
//! The frame buffer is 32 columns of 256 bytes; byte `column * 256 + line`
//! holds eight horizontal pixels of one scanline, MSB leftmost. Every CPU
//! write goes through a barrel shifter (with optional bit mirror) into a
//! 16-bit window spanning the addressed byte and the one in the next column,
//! then through a raster op against the current contents. Colour RAM has the
//! same layout and supplies 5 bits of colour per byte.
//!
//! Writes never touch the output bitmap. They mark scanlines dirty, and the
//! board materializes dirty lines as the beam advances ([`StarfireVideo::video_update`]).

use crate::video::{Bitmap, Palette};
use crate::video::palette::pal3bit;

pub const VRAM_SIZE: usize = 0x2000;

/// Raster operation applied to source `A` (shifted CPU data) and destination
/// `B` (current RAM), selected by the low nibble of control register 1
/// (inverted).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    NotSource,
    Nor,
    NotSourceAndDest,
    Clear,
    Nand,
    NotDest,
    Xor,
    SourceAndNotDest,
    NotSourceOrDest,
    Xnor,
    Dest,
    And,
    Set,
    SourceOrNotDest,
    Or,
    Source,
}

impl AluOp {
    pub fn from_vidctrl1(vidctrl1: u8) -> Self {
        match !vidctrl1 & 0x0f {
            0 => Self::NotSource,
            1 => Self::Nor,
            2 => Self::NotSourceAndDest,
            3 => Self::Clear,
            4 => Self::Nand,
            5 => Self::NotDest,
            6 => Self::Xor,
            7 => Self::SourceAndNotDest,
            8 => Self::NotSourceOrDest,
            9 => Self::Xnor,
            10 => Self::Dest,
            11 => Self::And,
            12 => Self::Set,
            13 => Self::SourceOrNotDest,
            14 => Self::Or,
            _ => Self::Source,
        }
    }

    /// Combine `a` and `b`; only bits inside `mask` are meaningful.
    pub fn apply(self, a: u16, b: u16, mask: u16) -> u16 {
        let r = match self {
            Self::NotSource => !a,
            Self::Nor => !(a | b),
            Self::NotSourceAndDest => !a & b,
            Self::Clear => 0,
            Self::Nand => !(a & b),
            Self::NotDest => !b,
            Self::Xor => a ^ b,
            Self::SourceAndNotDest => a & !b,
            Self::NotSourceOrDest => !a | b,
            Self::Xnor => !(a ^ b),
            Self::Dest => b,
            Self::And => a & b,
            Self::Set => 0xffff,
            Self::SourceOrNotDest => a | !b,
            Self::Or => a | b,
            Self::Source => a,
        };
        r & mask
    }
}

/// Shifter setup for one access, derived from the control registers and
/// address line 13.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteWindow {
    pub shift: u32,
    pub mirror: bool,
    pub mask: u16,
}

impl WriteWindow {
    pub fn new(offset: u16, vidctrl: u8, vidctrl1: u8) -> Self {
        let (shift, mirror) = if offset & 0x2000 != 0 {
            ((vidctrl >> 1) & 7, vidctrl & 1 != 0)
        } else {
            ((vidctrl >> 5) & 7, (vidctrl >> 4) & 1 != 0)
        };
        let mut mask = 0xff00u16 >> shift;
        // ROLL: the last row of columns only takes one half of the window.
        if offset & 0x1f00 == 0x1f00 {
            mask &= if vidctrl1 & 0x10 != 0 { 0x00ff } else { 0xff00 };
        }
        Self {
            shift: shift as u32,
            mirror,
            mask,
        }
    }
}

pub struct StarfireVideo {
    videoram: Vec<u8>,
    colorram: Vec<u8>,
    vidctrl: u8,
    vidctrl1: u8,
    /// Colour latched by the last colour RAM write.
    color: u8,
    scanline_dirty: [bool; 256],
}

impl Default for StarfireVideo {
    fn default() -> Self {
        Self::new()
    }
}

impl StarfireVideo {
    pub fn new() -> Self {
        Self {
            videoram: vec![0; VRAM_SIZE],
            colorram: vec![0; VRAM_SIZE],
            vidctrl: 0,
            vidctrl1: 0,
            color: 0,
            scanline_dirty: [true; 256],
        }
    }

    pub fn set_vidctrl(&mut self, data: u8) {
        self.vidctrl = data;
    }

    pub fn set_vidctrl1(&mut self, data: u8) {
        if self.vidctrl1 != data {
            log::trace!("starfire: vidctrl1 = 0x{data:02X} ({:?})", AluOp::from_vidctrl1(data));
        }
        self.vidctrl1 = data;
    }

    pub fn vidctrl(&self) -> u8 {
        self.vidctrl
    }

    pub fn vidctrl1(&self) -> u8 {
        self.vidctrl1
    }

    pub fn videoram(&self) -> &[u8] {
        &self.videoram
    }

    pub fn colorram(&self) -> &[u8] {
        &self.colorram
    }

    pub fn is_line_dirty(&self, line: usize) -> bool {
        self.scanline_dirty[line & 0xff]
    }

    pub fn mark_all_dirty(&mut self) {
        self.scanline_dirty = [true; 256];
    }

    /// Raw byte poke that bypasses the shifter (scratch RAM aliases).
    pub fn poke(&mut self, offset: u16, data: u8) {
        let o = offset as usize & (VRAM_SIZE - 1);
        if self.videoram[o] != data {
            self.videoram[o] = data;
            self.scanline_dirty[o & 0xff] = true;
        }
    }

    pub fn peek(&self, offset: u16) -> u8 {
        self.videoram[offset as usize & (VRAM_SIZE - 1)]
    }

    /// CPU write to video RAM. `offset` is 14 bits; bit 13 selects the
    /// second shifter setting and suppresses the colour RAM update.
    pub fn write(&mut self, offset: u16, data: u8) {
        // PROT: the first 32 bytes of each page are write protected.
        if offset & 0xe0 == 0 && self.vidctrl1 & 0x20 == 0 {
            return;
        }
        let o1 = offset as usize & 0x1fff;
        let o2 = (offset as usize + 0x100) & 0x1fff;
        let win = WriteWindow::new(offset, self.vidctrl, self.vidctrl1);

        let dm = if win.mirror { data.reverse_bits() } else { data };
        let ds = ((dm as u16) << 8) >> win.shift;
        let d0 = ((self.videoram[o1] as u16) << 8) | self.videoram[o2] as u16;

        let op = AluOp::from_vidctrl1(self.vidctrl1);
        let dalu = (d0 & !win.mask) | op.apply(ds & win.mask, d0 & win.mask, win.mask);

        self.videoram[o1] = (dalu >> 8) as u8;
        self.videoram[o2] = dalu as u8;
        self.scanline_dirty[o1 & 0xff] = true;

        // CDRM clear: the latched colour follows the pixels.
        if offset & 0x2000 == 0 && self.vidctrl1 & 0x80 == 0 {
            if win.mask & 0xff00 != 0 {
                self.colorram[o1] = self.color;
            }
            if win.mask & 0x00ff != 0 {
                self.colorram[o2] = self.color;
            }
        }
    }

    /// CPU read from video RAM: the inverse shift of a write, no side effects.
    pub fn read(&self, offset: u16) -> u8 {
        let win = WriteWindow::new(offset, self.vidctrl, self.vidctrl1);
        let o1 = offset as usize & 0x1fff;
        let o2 = (offset as usize + 0x100) & 0x1fff;
        let d0 = (self.videoram[o1] as u16 & (win.mask >> 8))
            | (self.videoram[o2] as u16 & win.mask);
        let d0 = (d0 << win.shift) | (d0 >> (8 - win.shift));
        d0 as u8
    }

    pub fn colorram_read(&self, offset: u16) -> u8 {
        self.colorram[offset as usize & 0x1fff]
    }

    /// CPU write to colour RAM. The first 32 bytes of each page form the
    /// pseudo-palette; writing there also sets a pen when TRANS is on.
    pub fn colorram_write(&mut self, offset: u16, data: u8, palette: &mut Palette) {
        let offset = offset as usize & 0x1fff;
        if offset & 0xe0 == 0 {
            self.colorram[offset & !0x100] = data;
            self.colorram[offset | 0x100] = data;
            self.color = data & 0x1f;
            if self.vidctrl1 & 0x40 == 0 {
                return;
            }
            let pen = (offset & 0x1f) | ((offset & 0x200) >> 4);
            let r = (((data as u16) << 1) & 6) | ((offset as u16 >> 8) & 1);
            let b = (data as u16 >> 2) & 7;
            let g = (data as u16 >> 5) & 7;
            palette.set_rgb(pen, (pal3bit(r), pal3bit(g), pal3bit(b)));
        } else {
            self.colorram[offset] = if self.vidctrl1 & 0x80 != 0 {
                self.color
            } else {
                data & 0x1f
            };
            self.scanline_dirty[offset & 0xff] = true;
            self.color = data & 0x1f;
        }
    }

    /// Materialize `count` scanlines starting at `scanline`, redrawing only
    /// dirty ones, then clear their flags.
    pub fn video_update(&mut self, scanline: usize, count: usize, bitmap: &mut Bitmap) {
        for y in scanline..(scanline + count).min(256) {
            if !self.scanline_dirty[y] {
                continue;
            }
            for column in 0..32 {
                let data = self.videoram[column * 256 + y];
                let color = (self.colorram[column * 256 + y] & 0x1f) as u16;
                for bit in 0..8 {
                    let lit = (data >> (7 - bit)) & 1 != 0;
                    let pen = color | if lit { 0x20 } else { 0 };
                    bitmap.set_pixel(column * 8 + bit, y, pen);
                }
            }
            self.scanline_dirty[y] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_decoding_is_inverted_nibble() {
        assert_eq!(AluOp::from_vidctrl1(0x0f), AluOp::NotSource);
        assert_eq!(AluOp::from_vidctrl1(0x00), AluOp::Source);
        assert_eq!(AluOp::from_vidctrl1(0xf5), AluOp::Dest);
    }

    #[test]
    fn roll_restricts_window() {
        let w = WriteWindow::new(0x1f40, 0x20, 0x10);
        assert_eq!(w.shift, 1);
        assert_eq!(w.mask, 0x7f80 & 0x00ff);
    }
}
