//! Fixed code tables and symbol mappings for DEFLATE (RFC 1951).
//!
//! DEFLATE specifies fixed Huffman codes that can be used instead of
//! transmitting custom codes, plus the base/extra-bit tables that map
//! match lengths and distances onto code symbols.

use crate::huffman::{self, DecodeTable, TableKind};
use std::sync::OnceLock;

/// Number of literal byte values.
pub const LITERALS: usize = 256;

/// End-of-block symbol.
pub const END_BLOCK: usize = 256;

/// Size of the literal/length alphabet (0-285).
pub const L_CODES: usize = LITERALS + 1 + 29;

/// Size of the distance alphabet (0-29).
pub const D_CODES: usize = 30;

/// Size of the code-length alphabet (0-18).
pub const BL_CODES: usize = 19;

/// Maximum bit length of any code.
pub const MAX_BITS: usize = 15;

/// Maximum bit length of a code-length code.
pub const MAX_BL_BITS: usize = 7;

/// Minimum match length.
pub const MIN_MATCH: usize = 3;

/// Maximum match length.
pub const MAX_MATCH: usize = 258;

/// Order of code length codes in a dynamic block header.
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length code base values for codes 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance code base values for codes 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3: 0 extra bits
    5, 7, // 4-5: 1 extra bit
    9, 13, // 6-7: 2 extra bits
    17, 25, // 8-9: 3 extra bits
    33, 49, // 10-11: 4 extra bits
    65, 97, // 12-13: 5 extra bits
    129, 193, // 14-15: 6 extra bits
    257, 385, // 16-17: 7 extra bits
    513, 769, // 18-19: 8 extra bits
    1025, 1537, // 20-21: 9 extra bits
    2049, 3073, // 22-23: 10 extra bits
    4097, 6145, // 24-25: 11 extra bits
    8193, 12289, // 26-27: 12 extra bits
    16385, 24577, // 28-29: 13 extra bits
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, // 0-3
    1, 1, // 4-5
    2, 2, // 6-7
    3, 3, // 8-9
    4, 4, // 10-11
    5, 5, // 12-13
    6, 6, // 14-15
    7, 7, // 16-17
    8, 8, // 18-19
    9, 9, // 20-21
    10, 10, // 22-23
    11, 11, // 24-25
    12, 12, // 26-27
    13, 13, // 28-29
];

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    for len in lengths.iter_mut().take(256).skip(144) {
        *len = 9;
    }
    for len in lengths.iter_mut().take(280).skip(256) {
        *len = 7;
    }
    lengths
}

/// Fixed distance code lengths: all 30 codes use 5 bits.
pub fn fixed_distance_lengths() -> [u8; 30] {
    [5u8; 30]
}

/// A canonical code ready for the bit writer: already bit-reversed so the
/// most significant code bit leaves first.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCode {
    /// Reversed code bits.
    pub code: u16,
    /// Code length in bits; zero means the symbol is unused.
    pub len: u8,
}

/// Fixed literal/length encoder codes, built once.
pub fn fixed_litlen_codes() -> &'static [WireCode; 288] {
    static CODES: OnceLock<[WireCode; 288]> = OnceLock::new();
    CODES.get_or_init(|| {
        let mut codes = [WireCode::default(); 288];
        huffman::codes_from_lengths(&fixed_litlen_lengths(), &mut codes);
        codes
    })
}

/// Fixed distance encoder codes, built once.
pub fn fixed_distance_codes() -> &'static [WireCode; 30] {
    static CODES: OnceLock<[WireCode; 30]> = OnceLock::new();
    CODES.get_or_init(|| {
        let mut codes = [WireCode::default(); 30];
        huffman::codes_from_lengths(&fixed_distance_lengths(), &mut codes);
        codes
    })
}

/// Fixed decode tables for static-Huffman blocks, built once.
///
/// The decode side covers the full code space: the literal/length set
/// includes the two reserved symbols 286-287 and the distance set fills
/// all 32 five-bit codes, so the reserved patterns decode as invalid data
/// rather than breaking the table.
pub fn fixed_decode_tables() -> &'static (DecodeTable, DecodeTable) {
    static TABLES: OnceLock<(DecodeTable, DecodeTable)> = OnceLock::new();
    TABLES.get_or_init(|| {
        let lit_lens: Vec<u16> = fixed_litlen_lengths().iter().map(|&l| l as u16).collect();
        let dist_lens = vec![5u16; 32];
        let lit = DecodeTable::build(TableKind::Lengths, &lit_lens, 9)
            .expect("fixed literal/length table construction cannot fail");
        let dist = DecodeTable::build(TableKind::Distances, &dist_lens, 5)
            .expect("fixed distance table construction cannot fail");
        (lit, dist)
    })
}

/// Convert a match length (3-258) to `(code, extra_bits, extra_value)`.
pub fn length_to_code(length: u16) -> (u16, u8, u16) {
    debug_assert!(
        (MIN_MATCH as u16..=MAX_MATCH as u16).contains(&length),
        "length out of range: {}",
        length
    );

    let length = length as usize;
    let code = match length {
        3..=10 => length - 3 + 257,
        11..=18 => (length - 11) / 2 + 265,
        19..=34 => (length - 19) / 4 + 269,
        35..=66 => (length - 35) / 8 + 273,
        67..=130 => (length - 67) / 16 + 277,
        131..=257 => (length - 131) / 32 + 281,
        _ => 285,
    };

    let base = LENGTH_BASE[code - 257] as usize;
    let extra_bits = LENGTH_EXTRA_BITS[code - 257];
    (code as u16, extra_bits, (length - base) as u16)
}

/// Convert a match distance (1-32768) to `(code, extra_bits, extra_value)`.
pub fn distance_to_code(distance: u16) -> (u16, u8, u16) {
    debug_assert!(distance >= 1, "distance out of range: {}", distance);

    let code = match distance {
        1 => 0,
        2 => 1,
        3 => 2,
        4 => 3,
        5..=6 => 4,
        7..=8 => 5,
        9..=12 => 6,
        13..=16 => 7,
        17..=24 => 8,
        25..=32 => 9,
        33..=48 => 10,
        49..=64 => 11,
        65..=96 => 12,
        97..=128 => 13,
        129..=192 => 14,
        193..=256 => 15,
        257..=384 => 16,
        385..=512 => 17,
        513..=768 => 18,
        769..=1024 => 19,
        1025..=1536 => 20,
        1537..=2048 => 21,
        2049..=3072 => 22,
        3073..=4096 => 23,
        4097..=6144 => 24,
        6145..=8192 => 25,
        8193..=12288 => 26,
        12289..=16384 => 27,
        16385..=24576 => 28,
        _ => 29, // 24577..=32768 (0 means 32768 after wrap, unused here)
    };

    let base = DISTANCE_BASE[code];
    let extra_bits = DISTANCE_EXTRA_BITS[code];
    (code as u16, extra_bits, distance - base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_litlen_lengths() {
        let lengths = fixed_litlen_lengths();
        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7); // End of block
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_fixed_distance_lengths() {
        assert!(fixed_distance_lengths().iter().all(|&l| l == 5));
    }

    #[test]
    fn test_fixed_codes_build() {
        // Canonical fixed codes: symbol 0 -> 00110000, reversed 00001100.
        let codes = fixed_litlen_codes();
        assert_eq!(codes[0].len, 8);
        assert_eq!(codes[0].code, 0b0000_1100);
        // End of block: 7 bits, all zero.
        assert_eq!(codes[256].len, 7);
        assert_eq!(codes[256].code, 0);
        let dist = fixed_distance_codes();
        assert!(dist.iter().all(|c| c.len == 5));
    }

    #[test]
    fn test_fixed_decode_tables_build() {
        let (lit, dist) = fixed_decode_tables();
        assert_eq!(lit.root_bits(), 9);
        assert_eq!(dist.root_bits(), 5);
    }

    #[test]
    fn test_length_to_code_roundtrip() {
        for length in 3..=258u16 {
            let (code, extra_bits, extra_value) = length_to_code(length);
            assert!((257..=285).contains(&code));
            assert!(extra_value < (1 << extra_bits) || extra_bits == 0);
            let decoded = LENGTH_BASE[(code - 257) as usize] + extra_value;
            assert_eq!(decoded, length, "roundtrip failed for length {}", length);
        }
    }

    #[test]
    fn test_distance_to_code_roundtrip() {
        for distance in 1..=32768u32 {
            let d = distance as u16;
            let (code, extra_bits, extra_value) = distance_to_code(d);
            assert!(code < 30);
            assert!(extra_value < (1 << extra_bits) || extra_bits == 0);
            let decoded = DISTANCE_BASE[code as usize] + extra_value;
            assert_eq!(decoded, d, "roundtrip failed for distance {}", d);
        }
    }

    #[test]
    fn test_specific_lengths() {
        assert_eq!(length_to_code(3), (257, 0, 0));
        assert_eq!(length_to_code(10), (264, 0, 0));
        assert_eq!(length_to_code(11), (265, 1, 0));
        assert_eq!(length_to_code(12), (265, 1, 1));
        assert_eq!(length_to_code(258), (285, 0, 0));
    }

    #[test]
    fn test_specific_distances() {
        assert_eq!(distance_to_code(1), (0, 0, 0));
        assert_eq!(distance_to_code(4), (3, 0, 0));
        assert_eq!(distance_to_code(5), (4, 1, 0));
        assert_eq!(distance_to_code(6), (4, 1, 1));
        assert_eq!(distance_to_code(24577), (29, 13, 0));
        assert_eq!(distance_to_code(32768), (29, 13, 8191));
    }
}
