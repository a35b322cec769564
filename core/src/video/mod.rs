//! Raster video building blocks shared by every board: pen bitmaps, planar
//! graphics decoding, the palette engine, dirty-cell tracking, drawing
//! primitives and cached tilemaps.

pub mod bitmap;
pub mod descramble;
pub mod dirty;
pub mod draw;
pub mod gfx;
pub mod palette;
pub mod tilemap;

use std::fmt;

pub use bitmap::{Bitmap, Rect};
pub use dirty::DirtyCells;
pub use draw::{GfxDraw, Transparency, copy_bitmap, copy_scroll_bitmap, draw_gfx, draw_gfx_rows};
pub use gfx::{GfxElement, GfxLayout, rgn_frac};
pub use palette::{ColorFormat, Palette, Rgb};
pub use tilemap::{TileInfo, Tilemap};

/// Failure to set up video state for a board.
///
/// Buffers are reserved fallibly so that a board which cannot get its
/// off-screen bitmap or dirty arrays reports it from its constructor instead
/// of aborting the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoError {
    Alloc { what: &'static str, bytes: usize },
}

impl fmt::Display for VideoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc { what, bytes } => {
                write!(f, "unable to allocate {bytes} bytes for {what}")
            }
        }
    }
}

impl std::error::Error for VideoError {}

/// Reserve and fill a vector without aborting on allocation failure.
pub(crate) fn try_filled_vec<T: Clone>(
    len: usize,
    value: T,
    what: &'static str,
) -> Result<Vec<T>, VideoError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| VideoError::Alloc {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, value);
    Ok(v)
}
