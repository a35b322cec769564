/// Identifies who is accessing the bus (for boards with more than one CPU
/// sharing RAM, e.g. Wiping's main and sound Z80s).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusMaster {
    Cpu(usize), // CPU 0, CPU 1, etc.
}

/// Memory-mapped access from an externally supplied CPU core.
///
/// Every board implements this once per address space. Handlers run to
/// completion synchronously and in issue order; there is no buffering, so a
/// `refresh` issued after a write always observes it.
pub trait Bus {
    type Address: Copy + Into<u64>; // u16 for 8-bit, u32 for 16/32-bit
    type Data; // u8 or u16

    fn read(&mut self, master: BusMaster, addr: Self::Address) -> Self::Data;
    fn write(&mut self, master: BusMaster, addr: Self::Address, data: Self::Data);

    /// Partial-word write for 16-bit buses. `mem_mask` has a bit set for every
    /// data bit the CPU actually drives (0xFF00 for an upper-byte write,
    /// 0x00FF for a lower-byte write, 0xFFFF for a full word).
    ///
    /// Byte-wide boards never see this; the default forwards the full value.
    fn write_masked(
        &mut self,
        master: BusMaster,
        addr: Self::Address,
        data: Self::Data,
        _mem_mask: Self::Data,
    ) {
        self.write(master, addr, data)
    }
}

/// Merge a (possibly partial) 16-bit write into the previous word.
///
/// Bits outside `mem_mask` keep their old value. Handlers compare the result
/// against `old` before committing so unchanged words never dirty a cell.
#[inline]
pub fn combine_word(old: u16, data: u16, mem_mask: u16) -> u16 {
    (old & !mem_mask) | (data & mem_mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_full_word() {
        assert_eq!(combine_word(0x1234, 0xABCD, 0xFFFF), 0xABCD);
    }

    #[test]
    fn combine_upper_byte_only() {
        assert_eq!(combine_word(0x1234, 0xABCD, 0xFF00), 0xAB34);
    }

    #[test]
    fn combine_lower_byte_only() {
        assert_eq!(combine_word(0x1234, 0xABCD, 0x00FF), 0x12CD);
    }
}
