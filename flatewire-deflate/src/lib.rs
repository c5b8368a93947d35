//! # Flatewire Deflate
//!
//! Pure Rust streaming implementation of raw DEFLATE (RFC 1951).
//!
//! Both engines are incremental byte-stream transducers meant for
//! embedding in protocol stacks such as WebSocket `permessage-deflate` or
//! HTTP transfer coding: the caller owns every buffer, and a stream can
//! suspend at any byte boundary and resume bit-for-bit where it left off.
//!
//! - **Compression**: sliding-window LZ77 matching over chained hashes,
//!   levels 0-9, strategies for filtered, run-length-only, Huffman-only
//!   and fixed-tree output, and per-block selection between stored,
//!   static-Huffman and dynamic-Huffman representations.
//! - **Decompression**: a resumable state machine covering all three
//!   block types, with an in-register fast path when buffers allow.
//!
//! This is the raw bitstream only: no zlib or gzip framing, no checksums.
//!
//! ## Example
//!
//! ```rust
//! use flatewire_deflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use flatewire_deflate::{DeflateStream, InflateStream};
//! use flatewire_core::traits::FlushMode;
//!
//! let mut enc = DeflateStream::with_level(6);
//! let mut out = vec![0u8; 64];
//! let (_, n, _) = enc.compress(b"abcabcabc", &mut out, FlushMode::Finish).unwrap();
//!
//! let mut dec = InflateStream::new();
//! let mut plain = vec![0u8; 64];
//! let (_, m, _) = dec.decompress(&out[..n], &mut plain, FlushMode::Finish).unwrap();
//! assert_eq!(&plain[..m], b"abcabcabc");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod huffman;
pub mod inflate;
mod lz77;
pub mod tables;

// Re-exports
pub use deflate::{deflate, DeflateStream, Params, Strategy};
pub use huffman::{DecodeTable, TableKind};
pub use inflate::{inflate, InflateStream};
pub use flatewire_core::error::{Error, Result};
pub use flatewire_core::traits::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
};
