//! Drawing primitives: element blits and bitmap copies with scrolling.

use super::{Bitmap, GfxElement, Palette, Rect};

/// Which pixels a draw leaves untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transparency {
    /// Every pixel is written.
    Opaque,
    /// For element draws, pixels whose raw value equals the pen are skipped.
    /// For bitmap copies, source pixels holding this pen are skipped.
    Pen(u16),
    /// Pixels whose colour-table lookup yields this pen are skipped.
    Color(u16),
}

/// One element placed on a bitmap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GfxDraw {
    pub code: usize,
    pub color: usize,
    pub flip_x: bool,
    pub flip_y: bool,
    pub x: i32,
    pub y: i32,
}

impl GfxDraw {
    pub fn new(code: usize, color: usize, x: i32, y: i32) -> Self {
        Self {
            code,
            color,
            x,
            y,
            ..Self::default()
        }
    }

    pub fn flipped(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }
}

/// Draw one element of `gfx` into `dest`, clipped to `clip`.
pub fn draw_gfx(
    dest: &mut Bitmap,
    gfx: &GfxElement,
    palette: &Palette,
    d: &GfxDraw,
    clip: &Rect,
    transparency: Transparency,
) {
    draw_gfx_rows(dest, gfx, palette, d, clip, transparency, |_| d.color);
}

/// Like [`draw_gfx`], but the colour code is chosen per destination row.
/// `row_color` receives the destination y coordinate.
pub fn draw_gfx_rows(
    dest: &mut Bitmap,
    gfx: &GfxElement,
    palette: &Palette,
    d: &GfxDraw,
    clip: &Rect,
    transparency: Transparency,
    row_color: impl Fn(i32) -> usize,
) {
    let Some(clip) = clip.intersect(&dest.bounds()) else {
        return;
    };
    let pixels = gfx.pixels(d.code);
    if pixels.is_empty() {
        return;
    }
    let w = gfx.width() as i32;
    let h = gfx.height() as i32;

    for row in 0..h {
        let dy = d.y + row;
        if dy < clip.min_y || dy > clip.max_y {
            continue;
        }
        let src_row = if d.flip_y { h - 1 - row } else { row };
        let line = &pixels[(src_row * w) as usize..((src_row + 1) * w) as usize];
        let color = row_color(dy);
        let out = dest.row_mut(dy as usize);
        for col in 0..w {
            let dx = d.x + col;
            if dx < clip.min_x || dx > clip.max_x {
                continue;
            }
            let src_col = if d.flip_x { w - 1 - col } else { col };
            let px = line[src_col as usize];
            let pen = palette.pen(gfx.color_index(color, px as usize));
            match transparency {
                Transparency::Pen(t) if px as u16 == t => continue,
                Transparency::Color(t) if pen == t => continue,
                _ => {}
            }
            out[dx as usize] = pen;
        }
    }
}

/// Copy `src` onto `dest` with its top-left corner at (`sx`, `sy`).
pub fn copy_bitmap(
    dest: &mut Bitmap,
    src: &Bitmap,
    sx: i32,
    sy: i32,
    clip: &Rect,
    transparency: Transparency,
) {
    let placed = Rect::new(
        sx,
        sx + src.width() as i32 - 1,
        sy,
        sy + src.height() as i32 - 1,
    );
    let Some(r) = clip
        .intersect(&dest.bounds())
        .and_then(|c| c.intersect(&placed))
    else {
        return;
    };
    for y in r.min_y..=r.max_y {
        let from = src.row((y - sy) as usize);
        let to = dest.row_mut(y as usize);
        for x in r.min_x..=r.max_x {
            let pen = from[(x - sx) as usize];
            if skips(transparency, pen) {
                continue;
            }
            to[x as usize] = pen;
        }
    }
}

fn skips(transparency: Transparency, pen: u16) -> bool {
    match transparency {
        Transparency::Opaque => false,
        Transparency::Pen(t) | Transparency::Color(t) => pen == t,
    }
}

/// Copy `src` onto `dest` with wrapping scroll.
///
/// `row_scroll` holds horizontal offsets for equal-height bands of rows and
/// `col_scroll` vertical offsets for equal-width bands of columns. A single
/// entry scrolls the whole bitmap on that axis. Positive offsets move the
/// image right or down. Only one of the two may have more than one entry;
/// with both empty this is a plain [`copy_bitmap`] at the origin.
pub fn copy_scroll_bitmap(
    dest: &mut Bitmap,
    src: &Bitmap,
    row_scroll: &[i32],
    col_scroll: &[i32],
    clip: &Rect,
    transparency: Transparency,
) {
    if row_scroll.is_empty() && col_scroll.is_empty() {
        copy_bitmap(dest, src, 0, 0, clip, transparency);
        return;
    }
    let Some(r) = clip.intersect(&dest.bounds()) else {
        return;
    };
    let sw = src.width() as i32;
    let sh = src.height() as i32;
    if sw == 0 || sh == 0 {
        return;
    }

    for y in r.min_y..=r.max_y {
        for x in r.min_x..=r.max_x {
            let (src_x, src_y) = if row_scroll.len() > 1 {
                let syy = (y - col_scroll.first().copied().unwrap_or(0)).rem_euclid(sh);
                let band = syy as usize * row_scroll.len() / sh as usize;
                ((x - row_scroll[band]).rem_euclid(sw), syy)
            } else {
                let sxx = (x - row_scroll.first().copied().unwrap_or(0)).rem_euclid(sw);
                let syy = if col_scroll.is_empty() {
                    y.rem_euclid(sh)
                } else {
                    let band = sxx as usize * col_scroll.len() / sw as usize;
                    (y - col_scroll[band]).rem_euclid(sh)
                };
                (sxx, syy)
            };
            let pen = src.pixel(src_x as usize, src_y as usize);
            if skips(transparency, pen) {
                continue;
            }
            dest.set_pixel(x as usize, y as usize, pen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize) -> Bitmap {
        let mut b = Bitmap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                b.set_pixel(x, y, (y * w + x) as u16);
            }
        }
        b
    }

    #[test]
    fn xy_scroll_wraps() {
        let src = ramp(4, 4);
        let mut dest = Bitmap::new(4, 4);
        let clip = dest.bounds();
        copy_scroll_bitmap(&mut dest, &src, &[1], &[2], &clip, Transparency::Opaque);
        // dest(1, 2) comes from src(0, 0).
        assert_eq!(dest.pixel(1, 2), src.pixel(0, 0));
        // dest(0, 0) comes from src(3, 2).
        assert_eq!(dest.pixel(0, 0), src.pixel(3, 2));
    }

    #[test]
    fn column_scroll_shifts_bands() {
        let src = ramp(4, 4);
        let mut dest = Bitmap::new(4, 4);
        // Two bands of two columns: left band down 1, right band up 1.
        let clip = dest.bounds();
        copy_scroll_bitmap(&mut dest, &src, &[], &[1, -1], &clip, Transparency::Opaque);
        assert_eq!(dest.pixel(0, 1), src.pixel(0, 0));
        assert_eq!(dest.pixel(3, 0), src.pixel(3, 1));
        assert_eq!(dest.pixel(2, 3), src.pixel(2, 0));
    }

    #[test]
    fn copy_honours_transparent_pen() {
        let mut src = Bitmap::new(2, 1);
        src.set_pixel(1, 0, 7);
        let mut dest = Bitmap::new(2, 1);
        dest.fill(9);
        let clip = dest.bounds();
        copy_bitmap(&mut dest, &src, 0, 0, &clip, Transparency::Pen(0));
        assert_eq!(dest.row(0), &[9, 7]);
    }
}
