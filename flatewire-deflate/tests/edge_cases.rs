//! Edge case tests for DEFLATE compression.

use flatewire_deflate::{deflate, inflate};

#[test]
fn test_empty_input() {
    let input = b"";
    let compressed = deflate(input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_single_byte_every_level() {
    for level in 0..=9 {
        let compressed = deflate(b"A", level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, b"A", "level {}", level);
    }
}

#[test]
fn test_all_zeros() {
    let input = vec![0u8; 1000];
    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    // All zeros should compress very well
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 5000];
    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    assert!(compressed.len() < input.len() / 20);
}

#[test]
fn test_max_match_length() {
    // Runs long enough to need several maximum-length (258) matches.
    let pattern = vec![42u8; 258];
    let mut input = Vec::new();
    for _ in 0..10 {
        input.extend_from_slice(&pattern);
    }

    let compressed = deflate(&input, 9).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_alternating_pattern() {
    let input: Vec<u8> = (0..1000)
        .map(|i| if i % 2 == 0 { b'A' } else { b'B' })
        .collect();

    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_large_input() {
    // 1MB of repetitive text crosses the window slide many times.
    let mut input = Vec::with_capacity(1024 * 1024);
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    while input.len() < 1024 * 1024 {
        input.extend_from_slice(pattern);
    }
    input.truncate(1024 * 1024);

    let compressed = deflate(&input, 5).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    assert_eq!(decompressed.len(), 1024 * 1024);
}

#[test]
fn test_window_boundary_sizes() {
    // Exactly W, 2W and 2W+1 bytes for the default 32 KiB window.
    for size in [32768usize, 65536, 65537] {
        let input: Vec<u8> = (0..size).map(|i| (i % 89) as u8).collect();
        for level in [1, 6, 9] {
            let compressed = deflate(&input, level).unwrap();
            let decompressed = inflate(&compressed).unwrap();
            assert_eq!(decompressed, input, "size {} level {}", size, level);
        }
    }
}

#[test]
fn test_match_at_window_distance() {
    // A pattern recurring at the full window distance.
    let mut input = vec![0u8; 32768];
    let pattern = b"PATTERN_TO_MATCH";
    input[0..pattern.len()].copy_from_slice(pattern);
    input[32768 - pattern.len()..32768].copy_from_slice(pattern);

    let compressed = deflate(&input, 1).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_incremental_pattern() {
    let mut input = Vec::new();
    for i in 0..256 {
        for _ in 0..10 {
            input.push(i as u8);
        }
    }

    for level in [1, 6] {
        let compressed = deflate(&input, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input);
    }
}

#[test]
fn test_compression_levels() {
    let input = b"Hello, world! This is a test of DEFLATE compression with various levels.";

    for level in 0..=9 {
        let compressed = deflate(input, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input, "Level {} failed", level);

        // Level 0 is stored blocks, so it carries header overhead.
        if level == 0 {
            assert!(compressed.len() > input.len());
        }
    }
}

#[test]
fn test_binary_data() {
    let input: Vec<u8> = (0..=255).cycle().take(5000).collect();

    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_text_with_high_bytes() {
    let input = "日本語のテキストと ASCII の混在、そして繰り返し繰り返し繰り返し".as_bytes();
    for level in [1, 6, 9] {
        let compressed = deflate(input, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input);
    }
}
