use marquee_core::video::descramble::{decode_byte, decode_word, descramble_words};

#[test]
fn test_decode_byte_golden_vector() {
    let perm = [0x3, 0x0, 0x7, 0x2, 0x5, 0x1, 0x4, 0x6];
    assert_eq!(decode_byte(0b1011_0100, &perm), 0b0011_1010);
}

#[test]
fn test_decode_byte_is_not_an_involution() {
    let perm = [0x3, 0x0, 0x7, 0x2, 0x5, 0x1, 0x4, 0x6];
    let once = decode_byte(0b1011_0100, &perm);
    assert_ne!(decode_byte(once, &perm), 0b1011_0100);
}

#[test]
fn test_decode_word_reverse() {
    let rev: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
    assert_eq!(decode_word(0x0001, &rev), 0x8000);
    assert_eq!(decode_word(0x00F0, &rev), 0x0F00);
}

#[test]
fn test_descramble_words_little_endian_pairs() {
    let rev: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
    // Word 0x0001 stored low byte first becomes 0x8000.
    let mut rom = [0x01, 0x00, 0x7F];
    descramble_words(&mut rom, &[rev], |_| 0);
    assert_eq!(rom, [0x00, 0x80, 0x7F]);
}
