use super::{VideoError, try_filled_vec};

/// One redraw flag per cached cell. Everything starts dirty so the first
/// refresh draws the whole surface.
#[derive(Clone, Debug)]
pub struct DirtyCells {
    flags: Vec<bool>,
}

impl DirtyCells {
    pub fn try_new(len: usize) -> Result<Self, VideoError> {
        Ok(Self {
            flags: try_filled_vec(len, true, "dirty flags")?,
        })
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flag `index` (wrapping) for redraw.
    #[inline]
    pub fn mark(&mut self, index: usize) {
        if let Some(len) = std::num::NonZeroUsize::new(self.flags.len()) {
            self.flags[index % len] = true;
        }
    }

    pub fn mark_all(&mut self) {
        self.flags.fill(true);
    }

    #[inline]
    pub fn is_dirty(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// Return whether `index` was dirty and clear it.
    #[inline]
    pub fn take(&mut self, index: usize) -> bool {
        match self.flags.get_mut(index) {
            Some(f) => std::mem::replace(f, false),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.flags.fill(false);
    }

    pub fn any(&self) -> bool {
        self.flags.iter().any(|&f| f)
    }
}
