//! Planar graphics decoding.
//!
//! A [`GfxLayout`] describes where each bit of an element lives inside a ROM
//! region: one offset per bitplane, per column and per row, all in bits, plus
//! the stride between consecutive elements. Bit `n` of a region is bit
//! `7 - n % 8` of byte `n / 8`. Plane 0 supplies the most significant bit of
//! the decoded pixel.

/// Offset expressed as a fraction of the region size (`num / den` of its
/// length in bits), resolved when the layout is decoded against a region.
/// A constant bit offset can be added to the result.
pub const fn rgn_frac(num: u32, den: u32) -> u32 {
    0x8000_0000 | ((num & 0x0f) << 27) | ((den & 0x0f) << 23)
}

const fn is_frac(v: u32) -> bool {
    v & 0x8000_0000 != 0
}

/// Resolve a possibly fractional offset against a region of `region_bits`.
fn resolve(v: u32, region_bits: u64) -> u64 {
    if !is_frac(v) {
        return v as u64;
    }
    let num = ((v >> 27) & 0x0f) as u64;
    let den = ((v >> 23) & 0x0f).max(1) as u64;
    (v & 0x007f_ffff) as u64 + region_bits * num / den
}

#[derive(Clone, Copy, Debug)]
pub struct GfxLayout {
    pub width: u32,
    pub height: u32,
    /// Element count, or a fraction of the region built with [`rgn_frac`].
    pub total: u32,
    pub plane_offsets: &'static [u32],
    pub x_offsets: &'static [u32],
    pub y_offsets: &'static [u32],
    /// Distance in bits between the starts of consecutive elements.
    pub char_increment: u32,
}

/// A decoded set of graphics elements, one byte per pixel.
#[derive(Clone, Debug)]
pub struct GfxElement {
    width: usize,
    height: usize,
    total: usize,
    granularity: usize,
    color_base: usize,
    total_colors: usize,
    data: Vec<u8>,
    pen_usage: Vec<u32>,
}

fn read_bit(region: &[u8], bit: u64) -> u8 {
    match region.get((bit / 8) as usize) {
        Some(b) => (b >> (7 - (bit % 8))) & 1,
        None => 0,
    }
}

impl GfxElement {
    /// Decode every element described by `layout` from `region`.
    ///
    /// `color_base` is the first colour-table entry used by this set and
    /// `total_colors` the number of colour codes it may select.
    pub fn decode(
        layout: &GfxLayout,
        region: &[u8],
        color_base: usize,
        total_colors: usize,
    ) -> Self {
        let width = layout.width as usize;
        let height = layout.height as usize;
        let planes = layout.plane_offsets.len();
        let region_bits = region.len() as u64 * 8;

        let total = if is_frac(layout.total) {
            let inc = layout.char_increment.max(1) as u64;
            let num = ((layout.total >> 27) & 0x0f) as u64;
            let den = ((layout.total >> 23) & 0x0f).max(1) as u64;
            (region_bits / inc * num / den) as usize
        } else {
            layout.total as usize
        };

        let planes_at: Vec<u64> = layout
            .plane_offsets
            .iter()
            .map(|&p| resolve(p, region_bits))
            .collect();
        let xs: Vec<u64> = layout
            .x_offsets
            .iter()
            .map(|&x| resolve(x, region_bits))
            .collect();
        let ys: Vec<u64> = layout
            .y_offsets
            .iter()
            .map(|&y| resolve(y, region_bits))
            .collect();

        let mut data = vec![0u8; total * width * height];
        let mut pen_usage = vec![0u32; total];

        for code in 0..total {
            let base = code as u64 * layout.char_increment as u64;
            let pixels = &mut data[code * width * height..(code + 1) * width * height];
            let mut usage = 0u32;
            for y in 0..height {
                for x in 0..width {
                    let offs = base + ys[y] + xs[x];
                    let mut pen = 0u8;
                    for &plane in &planes_at {
                        pen = (pen << 1) | read_bit(region, offs + plane);
                    }
                    pixels[y * width + x] = pen;
                    usage |= 1 << (pen & 31);
                }
            }
            pen_usage[code] = usage;
        }

        Self {
            width,
            height,
            total,
            granularity: 1 << planes,
            color_base,
            total_colors: total_colors.max(1),
            data,
            pen_usage,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of decoded elements.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Colour-table entries per colour code (`1 << planes`).
    pub fn granularity(&self) -> usize {
        self.granularity
    }

    pub fn color_base(&self) -> usize {
        self.color_base
    }

    pub fn total_colors(&self) -> usize {
        self.total_colors
    }

    /// Element codes wrap modulo the element count.
    pub fn wrap_code(&self, code: usize) -> usize {
        if self.total == 0 { 0 } else { code % self.total }
    }

    /// Row-major pixels of element `code`. Empty when nothing was decoded.
    pub fn pixels(&self, code: usize) -> &[u8] {
        if self.total == 0 {
            return &[];
        }
        let size = self.width * self.height;
        let start = self.wrap_code(code) * size;
        &self.data[start..start + size]
    }

    /// Bitmask of the pixel values element `code` contains.
    pub fn pen_usage(&self, code: usize) -> u32 {
        if self.total == 0 {
            return 0;
        }
        self.pen_usage[self.wrap_code(code)]
    }

    /// Colour-table index of pixel value `pixel` drawn in colour `color`.
    pub fn color_index(&self, color: usize, pixel: usize) -> usize {
        self.color_base + (color % self.total_colors) * self.granularity + pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PLANES_2: [u32; 2] = [0, 8];
    static X8: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
    static Y1: [u32; 1] = [0];

    #[test]
    fn plane_zero_is_msb() {
        let layout = GfxLayout {
            width: 8,
            height: 1,
            total: 1,
            plane_offsets: &PLANES_2,
            x_offsets: &X8,
            y_offsets: &Y1,
            char_increment: 16,
        };
        let gfx = GfxElement::decode(&layout, &[0b1000_0001, 0b1100_0000], 0, 1);
        assert_eq!(gfx.pixels(0), &[3, 1, 0, 0, 0, 0, 0, 2]);
        assert_eq!(gfx.pen_usage(0), 0b1111);
    }

    #[test]
    fn fractional_total_and_planes() {
        static PLANES: [u32; 2] = [rgn_frac(0, 2), rgn_frac(1, 2)];
        let layout = GfxLayout {
            width: 8,
            height: 1,
            total: rgn_frac(1, 2),
            plane_offsets: &PLANES,
            x_offsets: &X8,
            y_offsets: &Y1,
            char_increment: 8,
        };
        // Four bytes: two elements, plane 0 in the first half.
        let gfx = GfxElement::decode(&layout, &[0xFF, 0x00, 0x00, 0xFF], 0, 1);
        assert_eq!(gfx.total(), 2);
        assert!(gfx.pixels(0).iter().all(|&p| p == 2));
        assert!(gfx.pixels(1).iter().all(|&p| p == 1));
        // Codes wrap.
        assert_eq!(gfx.pixels(3), gfx.pixels(1));
    }
}
