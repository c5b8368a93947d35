//! Streaming traits shared by the compression and decompression engines.
//!
//! Both engines are incremental byte-stream transducers: each call consumes
//! as much input and produces as much output as the provided buffers allow,
//! then reports how far it got. Callers own all buffers; the engines never
//! block, sleep or spawn threads.

use crate::error::Result;

/// Status of a streaming decompression call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed to continue.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// The stream is complete.
    Done,
}

/// Status of a streaming compression call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input data can be accepted.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// The stream is complete.
    Done,
}

/// Flush mode for compression.
///
/// The mode is a hint about block boundaries and byte alignment; it never
/// changes the decompressed bytes, only how they are framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush. Buffer freely for best compression.
    #[default]
    None,
    /// Close the current block and emit an empty coded block so all
    /// pending bits leave, without padding to a byte boundary.
    Partial,
    /// Close the current block and pad to a byte boundary with an empty
    /// stored block. Output so far is decodable on its own.
    Sync,
    /// Like [`FlushMode::Sync`], and additionally forget the match
    /// history so decompression can restart from this point.
    Full,
    /// Close the current block without any alignment marker.
    Block,
    /// Complete the stream.
    Finish,
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress bytes from `input` into `output`.
    ///
    /// Returns `(bytes_consumed, bytes_produced, status)`. The call makes
    /// as much progress as the buffers permit; a stalled call is resumed
    /// by calling again with more input or output space.
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Return the compressor to its initial state, keeping allocations.
    fn reset(&mut self);

    /// Whether the stream has been finished.
    fn is_finished(&self) -> bool;

    /// Compress an entire buffer in one call sequence (convenience).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut input_pos = 0;

        loop {
            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, FlushMode::Finish)?;
            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }
        Ok(output)
    }
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress bytes from `input` into `output`.
    ///
    /// Returns `(bytes_consumed, bytes_produced, status)`.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Return the decompressor to its initial state, keeping allocations.
    fn reset(&mut self);

    /// Whether the end of the stream has been reached.
    fn is_finished(&self) -> bool;

    /// Decompress an entire buffer in one call sequence (convenience).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut input_pos = 0;

        loop {
            let (consumed, produced, status) =
                self.decompress(&input[input_pos..], &mut buffer)?;
            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);
            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput if input_pos >= input.len() => break,
                _ => continue,
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_mode_default() {
        assert_eq!(FlushMode::default(), FlushMode::None);
    }
}
