//! Palette engine: raw palette RAM to RGB, colour-table lookup, and the
//! per-frame used-colour tracking that decides when cached graphics must be
//! redrawn.
//!
//! Each frame a board calls [`Palette::clear_all_used`], marks every colour
//! its tiles and sprites reference, then calls [`Palette::recalc`]. A `true`
//! result means the set of used colours changed and every cache built from
//! the old mapping has to be marked dirty.

use super::GfxElement;
use crate::core::combine_word;

pub type Rgb = (u8, u8, u8);

/// Converts one raw palette word into RGB.
pub type ColorFormat = fn(u16) -> Rgb;

#[inline]
pub fn pal4bit(c: u16) -> u8 {
    let c = (c & 0x0f) as u8;
    (c << 4) | c
}

#[inline]
pub fn pal5bit(c: u16) -> u8 {
    let c = (c & 0x1f) as u8;
    (c << 3) | (c >> 2)
}

#[inline]
pub fn pal3bit(c: u16) -> u8 {
    let c = (c & 0x07) as u8;
    (c << 5) | (c << 2) | (c >> 1)
}

/// 4 bits per gun in the top three nibbles, plus one extra low bit per gun
/// in bits 3..1.
pub fn rrrrggggbbbbrgbx(d: u16) -> Rgb {
    let r = ((d >> 11) & 0x1e) | ((d >> 3) & 0x01);
    let g = ((d >> 7) & 0x1e) | ((d >> 2) & 0x01);
    let b = ((d >> 3) & 0x1e) | ((d >> 1) & 0x01);
    (pal5bit(r), pal5bit(g), pal5bit(b))
}

pub fn xxxxbbbbggggrrrr(d: u16) -> Rgb {
    (pal4bit(d), pal4bit(d >> 4), pal4bit(d >> 8))
}

pub fn rrrrggggbbbbxxxx(d: u16) -> Rgb {
    (pal4bit(d >> 12), pal4bit(d >> 8), pal4bit(d >> 4))
}

/// Format for palettes filled directly with [`Palette::set_rgb`].
pub fn fixed(_d: u16) -> Rgb {
    (0, 0, 0)
}

#[derive(Clone, Debug)]
pub struct Palette {
    format: ColorFormat,
    raw: Vec<u16>,
    rgb: Vec<Rgb>,
    colortable: Vec<u16>,
    used: Vec<bool>,
    prev_used: Vec<bool>,
}

impl Palette {
    /// A palette of `total_colors` pens, all black, with an identity colour
    /// table.
    pub fn new(total_colors: usize, format: ColorFormat) -> Self {
        let total = total_colors.max(1);
        Self {
            format,
            raw: vec![0; total],
            rgb: vec![(0, 0, 0); total],
            colortable: (0..total as u16).collect(),
            used: vec![false; total],
            prev_used: vec![false; total],
        }
    }

    /// Replace the identity colour table.
    pub fn with_colortable(mut self, table: Vec<u16>) -> Self {
        if !table.is_empty() {
            self.colortable = table;
        }
        self
    }

    pub fn total_colors(&self) -> usize {
        self.rgb.len()
    }

    pub fn colortable_len(&self) -> usize {
        self.colortable.len()
    }

    pub fn set_colortable_entry(&mut self, index: usize, pen: u16) {
        let len = self.colortable.len();
        self.colortable[index % len] = pen % self.rgb.len() as u16;
    }

    /// Pen for colour-table entry `index` (wrapping).
    #[inline]
    pub fn pen(&self, index: usize) -> u16 {
        self.colortable[index % self.colortable.len()]
    }

    /// RGB of pen `pen` (wrapping).
    #[inline]
    pub fn rgb(&self, pen: u16) -> Rgb {
        self.rgb[pen as usize % self.rgb.len()]
    }

    pub fn raw(&self, pen: usize) -> u16 {
        self.raw[pen % self.raw.len()]
    }

    /// Store a raw palette word and convert it.
    pub fn set_raw(&mut self, pen: usize, raw: u16) {
        let pen = pen % self.raw.len();
        self.raw[pen] = raw;
        self.rgb[pen] = (self.format)(raw);
    }

    /// 16-bit palette RAM write honouring the byte mask.
    pub fn write_word(&mut self, pen: usize, data: u16, mem_mask: u16) {
        let old = self.raw(pen);
        self.set_raw(pen, combine_word(old, data, mem_mask));
    }

    /// Byte write to the low half of a pen split across two RAM pages.
    pub fn write_split_lo(&mut self, pen: usize, data: u8) {
        let old = self.raw(pen);
        self.set_raw(pen, (old & 0xff00) | data as u16);
    }

    /// Byte write to the high half of a pen split across two RAM pages.
    pub fn write_split_hi(&mut self, pen: usize, data: u8) {
        let old = self.raw(pen);
        self.set_raw(pen, (old & 0x00ff) | ((data as u16) << 8));
    }

    /// Set a pen's colour directly (PROM-derived or ALU-written palettes).
    pub fn set_rgb(&mut self, pen: usize, rgb: Rgb) {
        let pen = pen % self.rgb.len();
        self.rgb[pen] = rgb;
    }

    pub fn clear_all_used(&mut self) {
        self.used.fill(false);
    }

    pub fn mark_used(&mut self, pen: u16) {
        let len = self.used.len();
        self.used[pen as usize % len] = true;
    }

    pub fn mark_all_used(&mut self) {
        self.used.fill(true);
    }

    pub fn is_used(&self, pen: u16) -> bool {
        self.used[pen as usize % self.used.len()]
    }

    /// Mark the pens that element `code` of `gfx` actually draws in colour
    /// `color`.
    pub fn mark_gfx_used(&mut self, gfx: &GfxElement, code: usize, color: usize) {
        let usage = gfx.pen_usage(code);
        for px in 0..gfx.granularity().min(32) {
            if usage & (1 << px) != 0 {
                self.mark_used(self.pen(gfx.color_index(color, px)));
            }
        }
    }

    /// Mark every pen of colour code `color` of `gfx`.
    pub fn mark_color_used(&mut self, gfx: &GfxElement, color: usize) {
        for px in 0..gfx.granularity() {
            self.mark_used(self.pen(gfx.color_index(color, px)));
        }
    }

    /// Close the frame's marking pass. Returns `true` when the used set
    /// differs from the previous frame's.
    pub fn recalc(&mut self) -> bool {
        let changed = self.used != self.prev_used;
        if changed {
            log::trace!(
                "palette used set changed ({} pens in use)",
                self.used.iter().filter(|&&u| u).count()
            );
            self.prev_used.copy_from_slice(&self.used);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgbx_expansion() {
        assert_eq!(rrrrggggbbbbrgbx(0xFFFE), (0xFF, 0xFF, 0xFF));
        assert_eq!(rrrrggggbbbbrgbx(0x0000), (0, 0, 0));
        // Red high nibble only: r = 0x1e -> 0xf7.
        assert_eq!(rrrrggggbbbbrgbx(0xF000), (0xF7, 0, 0));
        // Red extra bit only: r = 1 -> 0x08.
        assert_eq!(rrrrggggbbbbrgbx(0x0008), (0x08, 0, 0));
    }

    #[test]
    fn split_writes_combine() {
        let mut p = Palette::new(4, xxxxbbbbggggrrrr);
        p.write_split_lo(1, 0x2F);
        p.write_split_hi(1, 0x08);
        assert_eq!(p.raw(1), 0x082F);
        assert_eq!(p.rgb(1), (0xFF, 0x22, 0x88));
    }

    #[test]
    fn recalc_reports_changes_once() {
        let mut p = Palette::new(8, fixed);
        p.mark_used(3);
        assert!(p.recalc());
        p.clear_all_used();
        p.mark_used(3);
        assert!(!p.recalc());
        p.clear_all_used();
        assert!(p.recalc());
    }
}
