use super::{Palette, VideoError, try_filled_vec};

/// Inclusive clip rectangle in bitmap coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Rect {
    pub const fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> usize {
        (self.max_x - self.min_x + 1).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.max_y - self.min_y + 1).max(0) as usize
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Overlap of two rectangles, or `None` when they are disjoint.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            min_x: self.min_x.max(other.min_x),
            max_x: self.max_x.min(other.max_x),
            min_y: self.min_y.max(other.min_y),
            max_y: self.max_y.min(other.max_y),
        };
        (r.min_x <= r.max_x && r.min_y <= r.max_y).then_some(r)
    }
}

/// A pen-indexed pixel buffer.
///
/// Pixels hold pen numbers, not colours; the palette is applied when the
/// frame is converted for display. Off-screen bitmaps keep their contents
/// between frames so only dirty cells need redrawing.
#[derive(Clone, Debug)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
}

impl Bitmap {
    /// Allocate a bitmap cleared to pen 0, reporting allocation failure.
    pub fn try_new(width: usize, height: usize) -> Result<Self, VideoError> {
        let pixels = try_filled_vec(width * height, 0u16, "bitmap")?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Allocate a bitmap cleared to pen 0.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The whole bitmap as a clip rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, self.width as i32 - 1, 0, self.height as i32 - 1)
    }

    /// Pen at (x, y). Out-of-range coordinates read as pen 0.
    pub fn pixel(&self, x: usize, y: usize) -> u16 {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            0
        }
    }

    /// Set the pen at (x, y). Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, pen: u16) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = pen;
        }
    }

    pub fn row(&self, y: usize) -> &[u16] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u16] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn fill(&mut self, pen: u16) {
        self.pixels.fill(pen);
    }

    /// Fill the part of `rect` that lies inside the bitmap.
    pub fn fill_rect(&mut self, rect: &Rect, pen: u16) {
        let Some(r) = rect.intersect(&self.bounds()) else {
            return;
        };
        for y in r.min_y..=r.max_y {
            let row = self.row_mut(y as usize);
            row[r.min_x as usize..=r.max_x as usize].fill(pen);
        }
    }

    /// Convert `area` into RGB24 (3 bytes per pixel, row-major).
    ///
    /// `buffer` must hold at least `area.width() * area.height() * 3` bytes.
    pub fn to_rgb24(&self, palette: &Palette, area: &Rect, buffer: &mut [u8]) {
        let Some(r) = area.intersect(&self.bounds()) else {
            return;
        };
        let out_w = area.width();
        for y in r.min_y..=r.max_y {
            let row = self.row(y as usize);
            for x in r.min_x..=r.max_x {
                let (red, green, blue) = palette.rgb(row[x as usize]);
                let ox = (x - area.min_x) as usize;
                let oy = (y - area.min_y) as usize;
                let off = (oy * out_w + ox) * 3;
                buffer[off] = red;
                buffer[off + 1] = green;
                buffer[off + 2] = blue;
            }
        }
    }
}
