//! Sliding window and hash-chain string matcher for compression.
//!
//! The window holds `2 * W` bytes. `strstart` marks the next unprocessed
//! byte and `lookahead` counts buffered bytes ahead of it. A rolling
//! three-byte hash indexes every inserted position: `head[h]` is the most
//! recent position with hash `h`, and `prev[pos & (W-1)]` chains to the
//! previous one. When `strstart` crosses `W + MAX_DIST`, the upper half of
//! the window is copied down and every index is renumbered by `W`.

use crate::tables::{MAX_MATCH, MIN_MATCH};

/// Matching never looks closer to the window end than this: room for one
/// maximum-length match plus one inserted string.
pub(crate) const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Bytes past the live data kept zeroed so the match scan can overrun.
const WIN_INIT: usize = MAX_MATCH;

/// Hash chain terminator.
const NIL: u16 = 0;

/// Borrowed input being fed into the window.
#[derive(Debug)]
pub(crate) struct Feed<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Feed<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Copy up to `buf.len()` bytes into `buf`, returning the count.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

/// Window, hash index and match state for one compression stream.
#[derive(Debug)]
pub(crate) struct Matcher {
    /// Window half-size `W`.
    pub w_size: usize,
    /// `W - 1`, for chain indexing.
    pub w_mask: usize,
    /// `2 * W` bytes of input history plus lookahead.
    pub window: Vec<u8>,
    /// Chain links: previous position with the same hash.
    pub prev: Vec<u16>,
    /// Hash heads: most recent position per hash.
    pub head: Vec<u16>,
    hash_mask: usize,
    hash_shift: u32,
    ins_h: usize,

    /// Next unprocessed window position.
    pub strstart: usize,
    /// Window position where the current block began. Goes negative when
    /// a coded block spans a window slide.
    pub block_start: isize,
    /// Buffered bytes ahead of `strstart`.
    pub lookahead: usize,
    /// Trailing positions not yet inserted in the hash index.
    pub insert: usize,
    /// Start of the best match found by the last search.
    pub match_start: usize,
    /// Length of the best match found by the last search.
    pub match_length: usize,
    /// Match carried over from the previous position (lazy evaluation).
    pub prev_match: usize,
    /// Its length.
    pub prev_length: usize,
    /// Whether a previous-position match is pending.
    pub match_available: bool,
    high_water: usize,

    /// Shrink the chain search above this match length.
    pub good_match: usize,
    /// Do not lazy-search above this match length.
    pub max_lazy: usize,
    /// Stop searching at this match length.
    pub nice_match: usize,
    /// Chain positions to examine per search.
    pub max_chain: usize,
}

impl Matcher {
    pub fn new(w_bits: u8, mem_level: u8) -> Self {
        let w_size = 1usize << w_bits;
        let hash_bits = mem_level as usize + 7;
        let hash_size = 1usize << hash_bits;
        let mut m = Self {
            w_size,
            w_mask: w_size - 1,
            window: vec![0; 2 * w_size],
            prev: vec![NIL; w_size],
            head: vec![NIL; hash_size],
            hash_mask: hash_size - 1,
            hash_shift: ((hash_bits + MIN_MATCH - 1) / MIN_MATCH) as u32,
            ins_h: 0,
            strstart: 0,
            block_start: 0,
            lookahead: 0,
            insert: 0,
            match_start: 0,
            match_length: MIN_MATCH - 1,
            prev_match: 0,
            prev_length: MIN_MATCH - 1,
            match_available: false,
            high_water: 0,
            good_match: 0,
            max_lazy: 0,
            nice_match: 0,
            max_chain: 0,
        };
        m.reset();
        m
    }

    /// Furthest back a match may reach.
    pub fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    fn window_size(&self) -> usize {
        self.window.len()
    }

    pub fn clear_hash(&mut self) {
        self.head.fill(NIL);
    }

    pub fn reset(&mut self) {
        self.clear_hash();
        self.strstart = 0;
        self.block_start = 0;
        self.lookahead = 0;
        self.insert = 0;
        self.match_start = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_match = 0;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
        self.ins_h = 0;
        self.high_water = 0;
    }

    #[inline]
    fn update_hash(&self, h: usize, c: u8) -> usize {
        ((h << self.hash_shift) ^ c as usize) & self.hash_mask
    }

    /// Re-prime the rolling hash from the bytes at `strstart`.
    pub fn reseed_hash(&mut self) {
        self.ins_h = self.window[self.strstart] as usize;
        self.ins_h = self.update_hash(self.ins_h, self.window[self.strstart + 1]);
    }

    /// Insert the string at `strstart` into the hash index and return the
    /// previous head of its chain.
    #[inline]
    pub fn insert_string(&mut self) -> usize {
        let c = self.window[self.strstart + MIN_MATCH - 1];
        self.ins_h = self.update_hash(self.ins_h, c);
        let head = self.head[self.ins_h] as usize;
        self.prev[self.strstart & self.w_mask] = head as u16;
        self.head[self.ins_h] = self.strstart as u16;
        head
    }

    /// Top up the lookahead from `feed`, sliding the window first when the
    /// upper half is exhausted.
    pub fn fill_window(&mut self, feed: &mut Feed<'_>) {
        debug_assert!(self.lookahead < MIN_LOOKAHEAD);
        loop {
            let mut more = self.window_size() - self.lookahead - self.strstart;

            if self.strstart >= self.w_size + self.max_dist() {
                let w = self.w_size;
                self.window.copy_within(w..2 * w, 0);
                self.match_start = self.match_start.saturating_sub(w);
                self.prev_match = self.prev_match.saturating_sub(w);
                self.strstart -= w;
                self.block_start -= w as isize;

                // Renumber the hash index; positions now below zero fall
                // off the chain.
                for entry in self.head.iter_mut().chain(self.prev.iter_mut()) {
                    *entry = if *entry as usize >= w {
                        (*entry as usize - w) as u16
                    } else {
                        NIL
                    };
                }
                more += w;
            }
            if feed.is_empty() {
                break;
            }

            let start = self.strstart + self.lookahead;
            let n = feed.read_into(&mut self.window[start..start + more]);
            self.lookahead += n;

            // Index the positions that were waiting on more bytes.
            if self.lookahead + self.insert >= MIN_MATCH {
                let mut s = self.strstart - self.insert;
                self.ins_h = self.window[s] as usize;
                self.ins_h = self.update_hash(self.ins_h, self.window[s + 1]);
                while self.insert > 0 {
                    let c = self.window[s + MIN_MATCH - 1];
                    self.ins_h = self.update_hash(self.ins_h, c);
                    self.prev[s & self.w_mask] = self.head[self.ins_h];
                    self.head[self.ins_h] = s as u16;
                    s += 1;
                    self.insert -= 1;
                    if self.lookahead + self.insert < MIN_MATCH {
                        break;
                    }
                }
            }

            if self.lookahead >= MIN_LOOKAHEAD || feed.is_empty() {
                break;
            }
        }

        // Keep WIN_INIT bytes past the live data zeroed so the match scan
        // may read past the lookahead without tripping on stale bytes.
        if self.high_water < self.window_size() {
            let curr = self.strstart + self.lookahead;
            if self.high_water < curr {
                let init = (self.window_size() - curr).min(WIN_INIT);
                self.window[curr..curr + init].fill(0);
                self.high_water = curr + init;
            } else if self.high_water < curr + WIN_INIT {
                let init =
                    (curr + WIN_INIT - self.high_water).min(self.window_size() - self.high_water);
                let hw = self.high_water;
                self.window[hw..hw + init].fill(0);
                self.high_water += init;
            }
        }
    }

    /// Find the longest match for the string at `strstart`, following the
    /// hash chain from `cur_match`. Returns the match length, clamped to
    /// the lookahead; `match_start` is set when the result beats
    /// `prev_length`.
    pub fn longest_match(&mut self, mut cur_match: usize) -> usize {
        let mut chain_length = self.max_chain;
        let scan = self.strstart;
        let mut best_len = self.prev_length;
        let nice = self.nice_match.min(self.lookahead);
        let limit = if self.strstart > self.max_dist() {
            self.strstart - self.max_dist()
        } else {
            0
        };

        if self.prev_length >= self.good_match {
            chain_length >>= 2;
        }

        let w = &self.window;
        let mut match_start = self.match_start;
        let mut scan_end1 = w[scan + best_len - 1];
        let mut scan_end = w[scan + best_len];

        loop {
            debug_assert!(cur_match < scan);
            let m = cur_match;

            // Probe the match tail first: it filters almost everything
            // without touching the head of the candidate.
            if w[m + best_len] == scan_end
                && w[m + best_len - 1] == scan_end1
                && w[m] == w[scan]
                && w[m + 1] == w[scan + 1]
            {
                let len = 2 + common_prefix(
                    &w[scan + 2..scan + MAX_MATCH],
                    &w[m + 2..m + MAX_MATCH],
                );

                if len > best_len {
                    match_start = m;
                    best_len = len;
                    if len >= nice {
                        break;
                    }
                    scan_end1 = w[scan + best_len - 1];
                    scan_end = w[scan + best_len];
                }
            }

            cur_match = self.prev[cur_match & self.w_mask] as usize;
            if cur_match <= limit {
                break;
            }
            chain_length -= 1;
            if chain_length == 0 {
                break;
            }
        }

        self.match_start = match_start;
        best_len.min(self.lookahead)
    }

    /// Length of the run of the byte at `strstart - 1` continuing through
    /// `strstart`, up to one match length. Zero when there is no run.
    pub fn run_length(&self) -> usize {
        debug_assert!(self.strstart > 0 && self.lookahead >= MIN_MATCH);
        let w = &self.window;
        let s = self.strstart;
        let prev = w[s - 1];
        if prev != w[s] || prev != w[s + 1] || prev != w[s + 2] {
            return 0;
        }
        let mut i = s + MIN_MATCH;
        let end = s + MAX_MATCH;
        while i < end && w[i] == prev {
            i += 1;
        }
        (i - s).min(self.lookahead)
    }

    /// Preload the window with dictionary history, hashing every position
    /// so matches can reach into it from the first input byte.
    pub fn load_dictionary(&mut self, dictionary: &[u8]) {
        let mut dict = dictionary;
        if dict.len() >= self.w_size {
            self.clear_hash();
            self.strstart = 0;
            self.block_start = 0;
            self.insert = 0;
            dict = &dict[dict.len() - self.w_size..];
        }

        let mut feed = Feed::new(dict);
        self.fill_window(&mut feed);
        while self.lookahead >= MIN_MATCH {
            let mut s = self.strstart;
            let mut n = self.lookahead - (MIN_MATCH - 1);
            loop {
                let c = self.window[s + MIN_MATCH - 1];
                self.ins_h = self.update_hash(self.ins_h, c);
                self.prev[s & self.w_mask] = self.head[self.ins_h];
                self.head[self.ins_h] = s as u16;
                s += 1;
                n -= 1;
                if n == 0 {
                    break;
                }
            }
            self.strstart = s;
            self.lookahead = MIN_MATCH - 1;
            self.fill_window(&mut feed);
        }
        self.strstart += self.lookahead;
        self.block_start = self.strstart as isize;
        self.insert = self.lookahead;
        self.lookahead = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .unwrap_or_else(|| a.len().min(b.len()))
}
