//! History window for inflate back-references.
//!
//! The decompressor keeps the most recent `1 << bits` output bytes so a
//! back-reference can reach behind the start of the current output slice.
//! Within one call, references that land inside bytes already produced by
//! that call are resolved against the output slice directly; only the
//! overflow reaches into this window. After every call the freshly
//! produced bytes are committed here.

/// Circular buffer of recently produced output.
#[derive(Debug, Clone)]
pub struct Window {
    buf: Vec<u8>,
    /// Next write index.
    next: usize,
    /// Number of valid history bytes, up to the buffer size.
    have: usize,
}

impl Window {
    /// Create a window of `1 << bits` bytes, `bits` in `[8, 15]`.
    pub fn new(bits: u8) -> Self {
        debug_assert!((8..=15).contains(&bits));
        Self {
            buf: vec![0; 1 << bits],
            next: 0,
            have: 0,
        }
    }

    /// Window size in bytes.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Number of valid history bytes.
    pub fn have(&self) -> usize {
        self.have
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.next = 0;
        self.have = 0;
    }

    /// Absorb freshly produced output. Only the trailing `size()` bytes
    /// matter; older bytes fall out of history.
    pub fn commit(&mut self, produced: &[u8]) {
        let wsize = self.buf.len();
        if produced.len() >= wsize {
            self.buf.copy_from_slice(&produced[produced.len() - wsize..]);
            self.next = 0;
            self.have = wsize;
            return;
        }
        let mut rest = produced;
        let first = rest.len().min(wsize - self.next);
        self.buf[self.next..self.next + first].copy_from_slice(&rest[..first]);
        rest = &rest[first..];
        if !rest.is_empty() {
            // Wrapped: continue from the start of the buffer.
            self.buf[..rest.len()].copy_from_slice(rest);
            self.next = rest.len();
            self.have = wsize;
        } else {
            self.next += first;
            if self.next == wsize {
                self.next = 0;
            }
            self.have = (self.have + first).min(wsize);
        }
    }

    /// The contiguous run of history starting `back` bytes behind the
    /// newest byte. The run ends at the buffer wrap or the write head,
    /// whichever comes first; callers copy what they need and come back
    /// for the remainder.
    ///
    /// `back` must be in `[1, have()]`.
    pub fn history_segment(&self, back: usize) -> &[u8] {
        debug_assert!(back >= 1 && back <= self.have);
        if back > self.next {
            let start = self.buf.len() - (back - self.next);
            &self.buf[start..]
        } else {
            &self.buf[self.next - back..self.next]
        }
    }

    /// Preload history from a dictionary. Only the trailing `size()`
    /// bytes are kept when the dictionary is longer.
    pub fn preload_dictionary(&mut self, dictionary: &[u8]) {
        self.reset();
        self.commit(dictionary);
    }

    /// The current history, oldest byte first.
    pub fn dictionary(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.have);
        if self.have == self.buf.len() {
            out.extend_from_slice(&self.buf[self.next..]);
            out.extend_from_slice(&self.buf[..self.next]);
        } else {
            out.extend_from_slice(&self.buf[..self.next]);
        }
        out
    }
}
