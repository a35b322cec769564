//! Address decoding as a sorted interval table.
//!
//! Boards describe their memory map once, at construction, as a list of
//! inclusive address ranges each tagged with a handler value (usually a small
//! `Copy` enum naming the RAM block or register it maps to). Lookups are a
//! binary search over the sorted ranges and yield the handler together with
//! the offset of the access inside its range.

use std::fmt;
use std::ops::RangeInclusive;

/// A resolved access: which handler owns the address and the offset from the
/// start of its range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapped<H> {
    pub handler: H,
    pub offset: u32,
}

#[derive(Clone, Debug)]
struct Entry<H> {
    start: u32,
    end: u32,
    handler: H,
}

/// Sorted, non-overlapping table of address ranges.
#[derive(Clone, Debug)]
pub struct AddressMap<H> {
    /// Applied to every address before lookup (unconnected high address lines).
    addr_mask: u32,
    entries: Vec<Entry<H>>,
}

/// Errors detected while building an [`AddressMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressMapError {
    /// A range whose start lies above its end.
    Inverted { start: u32, end: u32 },
    /// Two ranges share at least one address.
    Overlap {
        first: (u32, u32),
        second: (u32, u32),
    },
}

impl fmt::Display for AddressMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inverted { start, end } => {
                write!(f, "address range 0x{start:X}-0x{end:X} is inverted")
            }
            Self::Overlap { first, second } => write!(
                f,
                "address range 0x{:X}-0x{:X} overlaps 0x{:X}-0x{:X}",
                second.0, second.1, first.0, first.1
            ),
        }
    }
}

impl std::error::Error for AddressMapError {}

impl<H: Copy> AddressMap<H> {
    /// Build a map from `(range, handler)` pairs in any order.
    pub fn new(
        addr_mask: u32,
        ranges: impl IntoIterator<Item = (RangeInclusive<u32>, H)>,
    ) -> Result<Self, AddressMapError> {
        let mut entries = Vec::new();
        for (range, handler) in ranges {
            let (start, end) = range.into_inner();
            if start > end {
                return Err(AddressMapError::Inverted { start, end });
            }
            entries.push(Entry {
                start,
                end,
                handler,
            });
        }
        entries.sort_by_key(|e| e.start);

        for pair in entries.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(AddressMapError::Overlap {
                    first: (pair[0].start, pair[0].end),
                    second: (pair[1].start, pair[1].end),
                });
            }
        }

        Ok(Self { addr_mask, entries })
    }

    /// Find the handler for `addr`, or `None` for unmapped space.
    pub fn resolve(&self, addr: u32) -> Option<Mapped<H>> {
        let addr = addr & self.addr_mask;
        let idx = self.entries.partition_point(|e| e.start <= addr);
        let entry = self.entries.get(idx.checked_sub(1)?)?;
        (addr <= entry.end).then(|| Mapped {
            handler: entry.handler,
            offset: addr - entry.start,
        })
    }

    /// Number of mapped ranges.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
