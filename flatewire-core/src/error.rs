//! Error types for flatewire operations.
//!
//! One error enum covers both engines. Corrupt-stream errors are fatal for
//! the stream that produced them; only a reset makes the stream usable
//! again. [`Error::NeedBuffers`] is the exception: it reports that a call
//! could make no progress at all, and the same call re-issued with more
//! input or output space will proceed.

use thiserror::Error;

/// The error type shared by the deflate and inflate engines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Out-of-range parameter at initialization.
    #[error("invalid parameter {name}: {value}")]
    InvalidParam {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// Caller misuse of the streaming API.
    #[error("stream misuse: {message}")]
    StreamMisuse {
        /// Description of the misuse.
        message: &'static str,
    },

    /// No progress possible: both input and output space are exhausted.
    ///
    /// Recoverable. Re-issue the call with a fresh input or output buffer.
    #[error("no progress possible without more input or output space")]
    NeedBuffers,

    /// Reserved block type 3 in a block header.
    #[error("invalid block type")]
    InvalidBlockType,

    /// Stored block LEN does not match the ones-complement NLEN.
    #[error("stored block length check failed")]
    BadStoredLength,

    /// More codes assigned than the code space permits.
    #[error("over-subscribed {kind} code set")]
    OversubscribedTable {
        /// Which alphabet the code set describes.
        kind: &'static str,
    },

    /// Code set leaves part of the code space unused.
    #[error("incomplete {kind} code set")]
    IncompleteTable {
        /// Which alphabet the code set describes.
        kind: &'static str,
    },

    /// A repeat code in the code-length sequence has no length to repeat,
    /// or runs past the announced number of lengths.
    #[error("invalid code length repeat")]
    InvalidCodeLengthRepeat,

    /// Decoded literal/length symbol outside the valid alphabet.
    #[error("invalid literal/length code")]
    InvalidLiteralLength,

    /// Decoded distance symbol outside the valid alphabet.
    #[error("invalid distance code")]
    InvalidDistanceCode,

    /// Back-reference reaches behind the start of the stream.
    #[error("distance too far back")]
    DistanceTooFarBack,

    /// Input ended mid-stream and the caller demanded completion.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Caller-provided buffer is too small for the requested data.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },
}

/// Result type alias for flatewire operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(name: &'static str, value: i64) -> Self {
        Self::InvalidParam { name, value }
    }

    /// Create a stream misuse error.
    pub fn misuse(message: &'static str) -> Self {
        Self::StreamMisuse { message }
    }

    /// Create an over-subscribed code set error.
    pub fn oversubscribed(kind: &'static str) -> Self {
        Self::OversubscribedTable { kind }
    }

    /// Create an incomplete code set error.
    pub fn incomplete(kind: &'static str) -> Self {
        Self::IncompleteTable { kind }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(needed: usize, available: usize) -> Self {
        Self::BufferTooSmall { needed, available }
    }

    /// Whether the stream can still make progress after this error.
    ///
    /// Only [`Error::NeedBuffers`] is recoverable without a reset.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NeedBuffers)
    }
}
