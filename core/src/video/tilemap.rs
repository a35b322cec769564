//! Cached, scrollable tile layer.
//!
//! A tilemap keeps a pre-rendered pixmap of all its tiles and redraws only
//! the ones flagged dirty. Boards translate their tile RAM into
//! [`TileInfo`] through a closure at render time, so the layer holds no
//! pointer to board memory.

use super::{Bitmap, DirtyCells, GfxElement, Palette, Rect, VideoError, try_filled_vec};

/// What to draw in one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileInfo {
    /// Index into the board's gfx sets.
    pub gfx: usize,
    pub code: usize,
    pub color: usize,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// Maps a (column, row) cell to its tile RAM index given the map size.
pub type TileScan = fn(col: usize, row: usize, cols: usize, rows: usize) -> usize;

pub fn scan_rows(col: usize, row: usize, cols: usize, _rows: usize) -> usize {
    row * cols + col
}

pub fn scan_cols(col: usize, row: usize, _cols: usize, rows: usize) -> usize {
    col * rows + row
}

#[derive(Clone, Debug)]
pub struct Tilemap {
    cols: usize,
    rows: usize,
    tile_width: usize,
    tile_height: usize,
    scan: TileScan,
    transparent_pen: Option<u8>,
    pixmap: Bitmap,
    opaque: Vec<bool>,
    dirty: DirtyCells,
    flip: bool,
    scroll_x: i32,
    scroll_y: i32,
}

impl Tilemap {
    /// `transparent_pen` is the raw pixel value left see-through when the
    /// layer is drawn; `None` makes the layer fully opaque.
    pub fn try_new(
        cols: usize,
        rows: usize,
        tile_width: usize,
        tile_height: usize,
        scan: TileScan,
        transparent_pen: Option<u8>,
    ) -> Result<Self, VideoError> {
        let width = cols * tile_width;
        let height = rows * tile_height;
        let opaque = if transparent_pen.is_some() {
            try_filled_vec(width * height, false, "tilemap mask")?
        } else {
            Vec::new()
        };
        Ok(Self {
            cols,
            rows,
            tile_width,
            tile_height,
            scan,
            transparent_pen,
            pixmap: Bitmap::try_new(width, height)?,
            opaque,
            dirty: DirtyCells::try_new(cols * rows)?,
            flip: false,
            scroll_x: 0,
            scroll_y: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.pixmap.width()
    }

    pub fn height(&self) -> usize {
        self.pixmap.height()
    }

    /// Tile RAM index of the cell at (`col`, `row`).
    pub fn memory_index(&self, col: usize, row: usize) -> usize {
        (self.scan)(col, row, self.cols, self.rows)
    }

    pub fn mark_tile_dirty(&mut self, index: usize) {
        self.dirty.mark(index);
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.mark_all();
    }

    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.is_dirty(index)
    }

    /// Flip both axes. Changing it invalidates every cached tile.
    pub fn set_flip(&mut self, flip: bool) {
        if self.flip != flip {
            self.flip = flip;
            self.dirty.mark_all();
        }
    }

    /// Positive values move the map left.
    pub fn set_scroll_x(&mut self, scroll: i32) {
        self.scroll_x = scroll;
    }

    /// Positive values move the map up.
    pub fn set_scroll_y(&mut self, scroll: i32) {
        self.scroll_y = scroll;
    }

    /// Redraw every dirty tile into the cached pixmap.
    pub fn update(
        &mut self,
        gfx: &[GfxElement],
        palette: &Palette,
        tile_info: impl Fn(usize) -> TileInfo,
    ) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let index = self.memory_index(col, row);
                if !self.dirty.take(index) {
                    continue;
                }
                let info = tile_info(index);
                let Some(set) = gfx.get(info.gfx) else {
                    continue;
                };
                self.draw_tile(set, palette, col, row, &info);
            }
        }
    }

    fn draw_tile(
        &mut self,
        set: &GfxElement,
        palette: &Palette,
        col: usize,
        row: usize,
        info: &TileInfo,
    ) {
        let (tw, th) = (self.tile_width, self.tile_height);
        let (cell_x, cell_y, flip_x, flip_y) = if self.flip {
            (
                self.cols - 1 - col,
                self.rows - 1 - row,
                !info.flip_x,
                !info.flip_y,
            )
        } else {
            (col, row, info.flip_x, info.flip_y)
        };
        let pixels = set.pixels(info.code);
        let sw = set.width();
        let width = self.pixmap.width();

        for y in 0..th {
            let py = cell_y * th + y;
            for x in 0..tw {
                let px = cell_x * tw + x;
                let sx = if flip_x { tw - 1 - x } else { x };
                let sy = if flip_y { th - 1 - y } else { y };
                // Elements smaller than the cell leave the rest transparent.
                let raw = if sx < sw && sy < set.height() {
                    pixels.get(sy * sw + sx).copied()
                } else {
                    None
                };
                let pen = raw
                    .map(|r| palette.pen(set.color_index(info.color, r as usize)))
                    .unwrap_or(0);
                self.pixmap.set_pixel(px, py, pen);
                if let Some(t) = self.transparent_pen {
                    self.opaque[py * width + px] = raw.is_some_and(|r| r != t);
                }
            }
        }
    }

    /// Draw the cached layer into `dest` with wrap-around scrolling.
    pub fn draw(&self, dest: &mut Bitmap, clip: &Rect) {
        let Some(r) = clip.intersect(&dest.bounds()) else {
            return;
        };
        let w = self.pixmap.width() as i32;
        let h = self.pixmap.height() as i32;
        if w == 0 || h == 0 {
            return;
        }
        let (ox, oy) = if self.flip {
            (
                w - dest.width() as i32 - self.scroll_x,
                h - dest.height() as i32 - self.scroll_y,
            )
        } else {
            (self.scroll_x, self.scroll_y)
        };

        for y in r.min_y..=r.max_y {
            let sy = (y + oy).rem_euclid(h) as usize;
            let src = self.pixmap.row(sy);
            let out = dest.row_mut(y as usize);
            for x in r.min_x..=r.max_x {
                let sx = (x + ox).rem_euclid(w) as usize;
                if self.transparent_pen.is_some() && !self.opaque[sy * w as usize + sx] {
                    continue;
                }
                out[x as usize] = src[sx];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::GfxLayout;
    use crate::video::palette::fixed;

    static PLANE: [u32; 1] = [0];
    static X8: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
    static Y8: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];

    fn one_bit_gfx() -> GfxElement {
        let layout = GfxLayout {
            width: 8,
            height: 8,
            total: 2,
            plane_offsets: &PLANE,
            x_offsets: &X8,
            y_offsets: &Y8,
            char_increment: 64,
        };
        let mut rom = [0u8; 16];
        rom[8..].fill(0xFF);
        GfxElement::decode(&layout, &rom, 0, 4)
    }

    #[test]
    fn only_dirty_tiles_are_redrawn() {
        let gfx = [one_bit_gfx()];
        let palette = Palette::new(8, fixed);
        let mut map = Tilemap::try_new(2, 2, 8, 8, scan_rows, None).unwrap();
        map.update(&gfx, &palette, |_| TileInfo::default());
        assert!(!map.is_dirty(0));

        map.mark_tile_dirty(3);
        map.update(&gfx, &palette, |i| TileInfo {
            code: 1,
            color: i,
            ..TileInfo::default()
        });
        let mut dest = Bitmap::new(16, 16);
        map.draw(&mut dest, &Rect::new(0, 15, 0, 15));
        // Cell 0 kept its old contents, cell 3 is code 1 in colour 3.
        assert_eq!(dest.pixel(0, 0), 0);
        assert_eq!(dest.pixel(8, 8), 3 * 2 + 1);
    }

    #[test]
    fn scroll_wraps_and_transparency_masks() {
        let gfx = [one_bit_gfx()];
        let palette = Palette::new(8, fixed);
        let mut map = Tilemap::try_new(2, 1, 8, 8, scan_rows, Some(0)).unwrap();
        map.update(&gfx, &palette, |i| TileInfo {
            code: i,
            ..TileInfo::default()
        });
        map.set_scroll_x(8);
        let mut dest = Bitmap::new(16, 8);
        dest.fill(5);
        map.draw(&mut dest, &Rect::new(0, 15, 0, 7));
        // Tile 1 now on the left and opaque, tile 0 wrapped to the right and clear.
        assert_eq!(dest.pixel(0, 0), 1);
        assert_eq!(dest.pixel(8, 0), 5);
    }
}
