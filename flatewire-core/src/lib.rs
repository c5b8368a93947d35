//! # Flatewire Core
//!
//! Core components for the flatewire DEFLATE codec.
//!
//! This crate provides the plumbing shared by the compression and
//! decompression engines:
//!
//! - [`bitstream`]: resumable bit-level I/O for variable-length codes
//! - [`window`]: history window for back-references during decompression
//! - [`traits`]: streaming compressor/decompressor contracts
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! Flatewire is a layered codec stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Host protocol                                       │
//! │     WebSocket permessage-deflate, HTTP transfer coding  │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec (flatewire-deflate)                           │
//! │     DeflateStream / InflateStream, Huffman, LZ77        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: BitStream (this crate)                              │
//! │     BitReader/BitWriter, Window, traits, errors         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is single-threaded and cooperatively incremental: one
//! logical owner drives a stream and suspends whenever input or output
//! space runs out. No internal threads, no blocking I/O.
//!
//! ## Example
//!
//! ```rust
//! use flatewire_core::bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.put_bits(0b1011, 4);
//! writer.align();
//! let mut buf = [0u8; 1];
//! writer.drain_into(&mut buf);
//!
//! let mut reader = BitReader::new(&buf);
//! assert_eq!(reader.pull(4), Some(0b1011));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use error::{Error, Result};
pub use traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};
pub use window::Window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{Error, Result};
    pub use crate::traits::{
        CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
    };
    pub use crate::window::Window;
}
