//! RGB24 images: PNG output, upscaling and graphics-set sheets.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use marquee_core::video::{GfxElement, Palette};

/// Elements per row of a graphics sheet.
const SHEET_COLUMNS: usize = 32;
/// Blank rows between sets on a sheet.
const SHEET_GAP: usize = 4;

/// An RGB24 image, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let o = (y * self.width + x) * 3;
        [self.data[o], self.data[o + 1], self.data[o + 2]]
    }

    fn put(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let o = (y * self.width + x) * 3;
        self.data[o..o + 3].copy_from_slice(&rgb);
    }

    /// Nearest-neighbour integer upscale.
    pub fn scaled(&self, scale: usize) -> Self {
        if scale <= 1 {
            return self.clone();
        }
        let mut out = Self::new(self.width * scale, self.height * scale);
        for y in 0..out.height {
            for x in 0..out.width {
                out.put(x, y, self.pixel(x / scale, y / scale));
            }
        }
        out
    }

    pub fn write_png(&self, path: &Path) -> Result<(), png::EncodingError> {
        let writer = BufWriter::new(File::create(path)?);
        let mut encoder = png::Encoder::new(writer, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut png_writer = encoder.write_header()?;
        png_writer.write_image_data(&self.data)?;
        log::info!("wrote {}x{} {}", self.width, self.height, path.display());
        Ok(())
    }
}

/// How sheet pixels get their colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetColors {
    /// Through the board palette using colour code `n` (wrapping per set).
    Palette(usize),
    /// Raw pixel values as evenly spaced grey levels.
    Grayscale,
}

/// Draw every element of every set, sets stacked top to bottom.
pub fn gfx_sheet(sets: &[GfxElement], palette: &Palette, colors: SheetColors) -> RgbImage {
    let populated: Vec<&GfxElement> = sets.iter().filter(|g| g.total() > 0).collect();
    let width = populated
        .iter()
        .map(|g| g.width() * SHEET_COLUMNS.min(g.total()))
        .max()
        .unwrap_or(0);
    let height: usize = populated
        .iter()
        .map(|g| g.height() * g.total().div_ceil(SHEET_COLUMNS) + SHEET_GAP)
        .sum();

    let mut sheet = RgbImage::new(width, height);
    let mut top = 0;
    for gfx in populated {
        let (w, h) = (gfx.width(), gfx.height());
        let max_level = gfx.granularity().saturating_sub(1).max(1);
        for code in 0..gfx.total() {
            let ox = (code % SHEET_COLUMNS) * w;
            let oy = top + (code / SHEET_COLUMNS) * h;
            for (i, &px) in gfx.pixels(code).iter().enumerate() {
                let rgb = match colors {
                    SheetColors::Palette(color) => {
                        let color = color % gfx.total_colors().max(1);
                        let (r, g, b) = palette.rgb(palette.pen(gfx.color_index(color, px as usize)));
                        [r, g, b]
                    }
                    SheetColors::Grayscale => {
                        let level = (px as usize * 255 / max_level) as u8;
                        [level; 3]
                    }
                };
                sheet.put(ox + i % w, oy + i / w, rgb);
            }
        }
        top += h * gfx.total().div_ceil(SHEET_COLUMNS) + SHEET_GAP;
    }
    sheet
}
