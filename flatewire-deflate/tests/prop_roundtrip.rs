//! Property tests: round-trips across levels, strategies and chunkings,
//! and the compressed-size upper bound.

use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use flatewire_deflate::{
    deflate, inflate, CompressStatus, DecompressStatus, DeflateStream, FlushMode, InflateStream,
    Params, Strategy,
};

fn roundtrip(input: &[u8], level: u8) {
    let compressed = deflate(input, level).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input, "level {}", level);
}

#[test]
fn test_roundtrip_structured_corpus() {
    let mut rng = StdRng::seed_from_u64(0x5EED_CAFE);

    for round in 0..40 {
        // Mix runs, random spans and repeated phrases, the shapes that
        // steer the encoder down different block types.
        let mut input = Vec::new();
        for _ in 0..rng.gen_range(1..20) {
            match rng.gen_range(0..4) {
                0 => {
                    let b: u8 = rng.gen();
                    let n = rng.gen_range(1..500);
                    input.extend(std::iter::repeat(b).take(n));
                }
                1 => {
                    let n = rng.gen_range(1..300);
                    input.extend((0..n).map(|_| rng.gen::<u8>()));
                }
                2 => {
                    input.extend_from_slice(b"a shared phrase that recurs ");
                }
                _ => {
                    let start = rng.gen_range(0..input.len().max(1));
                    let n = rng.gen_range(0..200).min(input.len() - start.min(input.len()));
                    let span: Vec<u8> = input[start..start + n].to_vec();
                    input.extend_from_slice(&span);
                }
            }
        }

        let level = (round % 10) as u8;
        roundtrip(&input, level);
    }
}

#[test]
fn test_roundtrip_all_strategies_on_mixed_data() {
    let mut rng = StdRng::seed_from_u64(42);
    let input: Vec<u8> = (0..20_000)
        .map(|i| {
            if i % 100 < 60 {
                b'a' + (i % 17) as u8
            } else {
                rng.gen()
            }
        })
        .collect();

    for strategy in [
        Strategy::Default,
        Strategy::Filtered,
        Strategy::HuffmanOnly,
        Strategy::Rle,
        Strategy::Fixed,
    ] {
        for level in [1, 6, 9] {
            let mut enc = DeflateStream::new(Params::new(level, 15, 8, strategy).unwrap());
            let mut out = vec![0u8; enc.upper_bound(input.len() as u64) as usize];
            let (_, n, status) = enc.compress(&input, &mut out, FlushMode::Finish).unwrap();
            assert_eq!(status, CompressStatus::Done);
            assert_eq!(
                inflate(&out[..n]).unwrap(),
                input,
                "{:?} level {}",
                strategy,
                level
            );
        }
    }
}

#[test]
fn test_roundtrip_window_and_memory_corners() {
    let mut rng = StdRng::seed_from_u64(7);
    let input: Vec<u8> = (0..50_000).map(|_| rng.gen_range(b'a'..b'f')).collect();

    for (wbits, mem_level) in [(9, 1), (9, 9), (12, 4), (15, 1), (15, 9)] {
        let mut enc =
            DeflateStream::new(Params::new(6, wbits, mem_level, Strategy::Default).unwrap());
        let mut out = vec![0u8; enc.upper_bound(input.len() as u64) as usize];
        let (_, n, status) = enc.compress(&input, &mut out, FlushMode::Finish).unwrap();
        assert_eq!(status, CompressStatus::Done);
        assert_eq!(
            inflate(&out[..n]).unwrap(),
            input,
            "wbits {} mem {}",
            wbits,
            mem_level
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_arbitrary_bytes(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        level in 0u8..=9,
    ) {
        let compressed = deflate(&data, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        prop_assert_eq!(decompressed, data);
    }

    #[test]
    fn prop_upper_bound_sound(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        level in 0u8..=9,
    ) {
        let stream = DeflateStream::with_level(level);
        let bound = stream.upper_bound(data.len() as u64) as usize;
        let compressed = deflate(&data, level).unwrap();
        prop_assert!(compressed.len() <= bound);
    }

    #[test]
    fn prop_chunked_equals_single_shot(
        data in proptest::collection::vec(any::<u8>(), 1..2048),
        in_chunk in 1usize..512,
        out_chunk in 1usize..512,
    ) {
        let whole = deflate(&data, 6).unwrap();

        let mut stream = DeflateStream::with_level(6);
        let mut chunked = Vec::new();
        let mut buf = vec![0u8; out_chunk];
        let mut pos = 0;
        loop {
            let end = data.len().min(pos + in_chunk);
            let flush = if end == data.len() { FlushMode::Finish } else { FlushMode::None };
            let (consumed, produced, status) =
                stream.compress(&data[pos..end], &mut buf, flush).unwrap();
            pos += consumed;
            chunked.extend_from_slice(&buf[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn prop_chunked_inflate_recovers(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        out_chunk in 1usize..256,
    ) {
        let compressed = deflate(&data, 9).unwrap();

        let mut stream = InflateStream::new();
        let mut out = Vec::new();
        let mut buf = vec![0u8; out_chunk];
        let mut pos = 0;
        loop {
            let (consumed, produced, status) =
                stream.decompress(&compressed[pos..], &mut buf, FlushMode::Finish).unwrap();
            pos += consumed;
            out.extend_from_slice(&buf[..produced]);
            if status == DecompressStatus::Done {
                break;
            }
        }
        prop_assert_eq!(out, data);
    }
}
