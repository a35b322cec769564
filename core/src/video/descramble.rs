//! Bit-permutation descrambling for encrypted graphics ROMs.
//!
//! Some boards scramble the data lines of their graphics ROMs, with the
//! permutation in effect chosen by a few address lines. Decoding runs once,
//! in place, before the region is handed to [`GfxElement::decode`]. It is not
//! an involution: decoding twice does not restore the dump.
//!
//! [`GfxElement::decode`]: super::GfxElement::decode

/// Bit `7 - i` of the result is bit `perm[i]` of `src`.
#[inline]
pub fn decode_byte(src: u8, perm: &[u8; 8]) -> u8 {
    perm.iter()
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | (((src >> b) & 1) << (7 - i)))
}

/// Bit `15 - i` of the result is bit `perm[i]` of `src`.
#[inline]
pub fn decode_word(src: u16, perm: &[u8; 16]) -> u16 {
    perm.iter()
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | (((src >> b) & 1) << (15 - i)))
}

/// Decode every byte of `rom`, choosing the table with `select(address)`.
/// Selector results wrap modulo the number of tables.
pub fn descramble_bytes(rom: &mut [u8], tables: &[[u8; 8]], select: impl Fn(u32) -> usize) {
    if tables.is_empty() {
        return;
    }
    for (a, byte) in rom.iter_mut().enumerate() {
        let perm = &tables[select(a as u32) % tables.len()];
        *byte = decode_byte(*byte, perm);
    }
}

/// Decode `rom` as little-endian 16-bit words (low byte at the even
/// address), choosing the table with `select(even_address)`. A trailing odd
/// byte is left alone.
pub fn descramble_words(rom: &mut [u8], tables: &[[u8; 16]], select: impl Fn(u32) -> usize) {
    if tables.is_empty() {
        return;
    }
    for (i, pair) in rom.chunks_exact_mut(2).enumerate() {
        let a = (i * 2) as u32;
        let perm = &tables[select(a) % tables.len()];
        let word = decode_word(u16::from_le_bytes([pair[0], pair[1]]), perm);
        pair.copy_from_slice(&word.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [u8; 8] = [7, 6, 5, 4, 3, 2, 1, 0];

    #[test]
    fn identity_permutation() {
        for v in 0..=255u8 {
            assert_eq!(decode_byte(v, &IDENTITY), v);
        }
    }

    #[test]
    fn reversal_permutation() {
        let rev = [0, 1, 2, 3, 4, 5, 6, 7];
        assert_eq!(decode_byte(0b0000_0001, &rev), 0b1000_0000);
        assert_eq!(decode_byte(0b1100_0000, &rev), 0b0000_0011);
    }

    #[test]
    fn word_identity() {
        let id: [u8; 16] = [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0];
        assert_eq!(decode_word(0xBEEF, &id), 0xBEEF);
    }

    #[test]
    fn table_selected_by_address() {
        let tables = [IDENTITY, [0, 1, 2, 3, 4, 5, 6, 7]];
        let mut rom = [0x01, 0x01, 0x01, 0x01];
        descramble_bytes(&mut rom, &tables, |a| (a & 1) as usize);
        assert_eq!(rom, [0x01, 0x80, 0x01, 0x80]);
    }
}
