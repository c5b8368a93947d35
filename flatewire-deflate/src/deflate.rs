//! DEFLATE compression engine.
//!
//! [`DeflateStream`] is an incremental raw-DEFLATE encoder. Input arrives
//! through repeated [`DeflateStream::compress`] calls; compressed bytes
//! accumulate in an internal pending buffer and drain into the caller's
//! output slice. The stream suspends whenever either buffer runs out and
//! resumes exactly where it left off.
//!
//! Per level, matching is driven by one of five block producers: stored
//! (level 0), fast (levels 1-3, greedy), slow (levels 4-9, lazy), plus the
//! run-length and Huffman-only producers selected by strategy. At each
//! block boundary the emitter costs a stored, a static-Huffman and a
//! dynamic-Huffman representation and sends the cheapest.

use crate::huffman::{self, AlphabetDesc, Node, HEAP_SIZE};
use crate::lz77::{Feed, Matcher, MIN_LOOKAHEAD};
use crate::tables::{
    distance_to_code, fixed_distance_codes, fixed_litlen_codes, length_to_code, WireCode,
    BL_CODES, CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, D_CODES, END_BLOCK, LENGTH_EXTRA_BITS,
    LITERALS, L_CODES, MAX_BITS, MAX_BL_BITS, MIN_MATCH,
};
use flatewire_core::bitstream::BitWriter;
use flatewire_core::error::{Error, Result};
use flatewire_core::traits::{CompressStatus, Compressor, FlushMode};

/// Matches of length 3 are discarded if their distance exceeds this.
const TOO_FAR: usize = 4096;

/// Block type tags in the 3-bit block header.
const STORED_BLOCK: u32 = 0;
const STATIC_TREES: u32 = 1;
const DYN_TREES: u32 = 2;

/// Code-length alphabet repeat symbols.
const REP_3_6: usize = 16;
const REPZ_3_10: usize = 17;
const REPZ_11_138: usize = 18;

/// Extra bits for the code-length alphabet.
static EXTRA_BL_BITS: [u8; BL_CODES] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// Compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Normal LZ77 + Huffman compression.
    #[default]
    Default,
    /// Drop small far-away matches; helps data with scattered structure.
    Filtered,
    /// Huffman coding only, no string matching.
    HuffmanOnly,
    /// Matches restricted to distance one (run-length encoding).
    Rle,
    /// Always emit static-Huffman blocks.
    Fixed,
}

/// Which block producer a level maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Stored,
    Fast,
    Slow,
}

struct Config {
    good: u16,
    lazy: u16,
    nice: u16,
    chain: u16,
    kind: MatchKind,
}

/// Per-level matcher tuning. Values tuned to avoid worst-case behavior on
/// pathological inputs.
#[rustfmt::skip]
static CONFIGURATION_TABLE: [Config; 10] = [
    Config { good:  0, lazy:   0, nice:   0, chain:    0, kind: MatchKind::Stored },
    Config { good:  4, lazy:   4, nice:   8, chain:    4, kind: MatchKind::Fast },
    Config { good:  4, lazy:   5, nice:  16, chain:    8, kind: MatchKind::Fast },
    Config { good:  4, lazy:   6, nice:  32, chain:   32, kind: MatchKind::Fast },
    Config { good:  4, lazy:   4, nice:  16, chain:   16, kind: MatchKind::Slow },
    Config { good:  8, lazy:  16, nice:  32, chain:   32, kind: MatchKind::Slow },
    Config { good:  8, lazy:  16, nice: 128, chain:  128, kind: MatchKind::Slow },
    Config { good:  8, lazy:  32, nice: 128, chain:  256, kind: MatchKind::Slow },
    Config { good: 32, lazy: 128, nice: 258, chain: 1024, kind: MatchKind::Slow },
    Config { good: 32, lazy: 258, nice: 258, chain: 4096, kind: MatchKind::Slow },
];

/// Validated stream parameters.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// Compression level, 0-9.
    pub level: u8,
    /// Window size exponent; the window is `1 << wbits` bytes.
    pub wbits: u8,
    /// Memory/effort exponent, 1-9; sizes the hash table and token buffer.
    pub mem_level: u8,
    /// Matching strategy.
    pub strategy: Strategy,
}

impl Params {
    /// Level value requesting the default (6).
    pub const DEFAULT_LEVEL: i32 = -1;

    /// Validate parameters.
    ///
    /// `level` is 0-9 or [`Params::DEFAULT_LEVEL`]; `wbits` is 8-15, where
    /// 8 is promoted to 9 (the 256-byte window was never reliable in
    /// deployed decoders, so it is not produced); `mem_level` is 1-9.
    pub fn new(level: i32, wbits: u8, mem_level: u8, strategy: Strategy) -> Result<Self> {
        let level = if level == Self::DEFAULT_LEVEL { 6 } else { level };
        if !(0..=9).contains(&level) {
            return Err(Error::invalid_param("level", level as i64));
        }
        if !(8..=15).contains(&wbits) {
            return Err(Error::invalid_param("wbits", wbits as i64));
        }
        if !(1..=9).contains(&mem_level) {
            return Err(Error::invalid_param("mem_level", mem_level as i64));
        }
        let wbits = if wbits == 8 { 9 } else { wbits };
        Ok(Self {
            level: level as u8,
            wbits,
            mem_level,
            strategy,
        })
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            level: 6,
            wbits: 15,
            mem_level: 8,
            strategy: Strategy::Default,
        }
    }
}

/// Outcome of one block producer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    /// Output space ran out mid-block.
    NeedMore,
    /// The requested flush point was reached.
    BlockDone,
    /// The final block was emitted but output space ran out.
    FinishStarted,
    /// The final block was emitted and drained.
    FinishDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Busy,
    Finish,
}

/// Output slice being filled during one call. An unbounded sink never
/// reports full and drains nothing: bytes stay pending for a later call.
struct Sink<'a> {
    out: &'a mut [u8],
    pos: usize,
    bounded: bool,
}

impl<'a> Sink<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Self {
            out,
            pos: 0,
            bounded: true,
        }
    }

    fn bottomless() -> Sink<'static> {
        Sink {
            out: &mut [],
            pos: 0,
            bounded: false,
        }
    }

    fn full(&self) -> bool {
        self.bounded && self.pos == self.out.len()
    }
}

fn flush_pending(writer: &mut BitWriter, sink: &mut Sink<'_>) {
    writer.flush_whole_bytes();
    if sink.bounded {
        sink.pos += writer.drain_into(&mut sink.out[sink.pos..]);
    }
}

fn rank(flush: FlushMode) -> i32 {
    match flush {
        FlushMode::None => 0,
        FlushMode::Block => 1,
        FlushMode::Partial => 2,
        FlushMode::Sync => 4,
        FlushMode::Full => 6,
        FlushMode::Finish => 8,
    }
}

/// Incremental raw-DEFLATE encoder.
#[derive(Debug)]
pub struct DeflateStream {
    params: Params,
    kind: MatchKind,
    status: Status,
    /// Flush mode of the previous call; `None` right after an output
    /// stall, so the retry is not mistaken for a duplicate flush.
    last_flush: Option<FlushMode>,
    writer: BitWriter,
    m: Matcher,

    /// Token buffer capacity; a block flush is forced one short of it.
    lit_bufsize: usize,
    /// Match distances, zero for literals.
    d_buf: Vec<u16>,
    /// Literal bytes, or match lengths minus the minimum.
    l_buf: Vec<u8>,

    dyn_ltree: Vec<Node>,
    dyn_dtree: Vec<Node>,
    bl_tree: Vec<Node>,

    total_in: u64,
    total_out: u64,
}

impl DeflateStream {
    /// Create a stream with the given parameters.
    pub fn new(params: Params) -> Self {
        let lit_bufsize = 1usize << (params.mem_level + 6);
        let mut m = Matcher::new(params.wbits, params.mem_level);
        let cfg = &CONFIGURATION_TABLE[params.level as usize];
        m.good_match = cfg.good as usize;
        m.max_lazy = cfg.lazy as usize;
        m.nice_match = cfg.nice as usize;
        m.max_chain = cfg.chain as usize;

        let mut s = Self {
            params,
            kind: cfg.kind,
            status: Status::Busy,
            last_flush: Some(FlushMode::None),
            writer: BitWriter::new(),
            m,
            lit_bufsize,
            d_buf: Vec::with_capacity(lit_bufsize),
            l_buf: Vec::with_capacity(lit_bufsize),
            dyn_ltree: vec![Node::default(); HEAP_SIZE],
            dyn_dtree: vec![Node::default(); 2 * D_CODES + 1],
            bl_tree: vec![Node::default(); 2 * BL_CODES + 1],
            total_in: 0,
            total_out: 0,
        };
        s.init_block();
        s
    }

    /// Create a stream with default window and memory settings.
    pub fn with_level(level: u8) -> Self {
        Self::new(Params {
            level: level.min(9),
            ..Params::default()
        })
    }

    /// Stream parameters.
    pub fn params(&self) -> Params {
        self.params
    }

    /// Total bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Bytes and bits of output not yet drained.
    pub fn pending(&self) -> (usize, u8) {
        (self.writer.pending_len(), self.writer.pending_bits())
    }

    /// Insert bits into the output ahead of the next emission. Useful for
    /// splicing a stream after a block boundary.
    pub fn prime(&mut self, mut bits: u8, mut value: u32) {
        while bits > 0 {
            let put = bits.min(16);
            self.writer.put_bits(value, put);
            value >>= put;
            bits -= put;
        }
    }

    /// Worst-case compressed size for `source_len` input bytes under the
    /// current parameters.
    pub fn upper_bound(&self, source_len: u64) -> u64 {
        // Conservative: fixed blocks instead of stored can expand some
        // inputs under non-default parameters.
        let complen = source_len + ((source_len + 7) >> 3) + ((source_len + 63) >> 6) + 5;
        if self.params.wbits != 15 || self.params.mem_level != 8 {
            return complen;
        }
        source_len + (source_len >> 12) + (source_len >> 14) + (source_len >> 25) + 13 - 6
    }

    /// Return to the freshly initialized state, keeping buffers.
    pub fn reset(&mut self) {
        self.status = Status::Busy;
        self.last_flush = Some(FlushMode::None);
        self.writer.reset();
        self.m.reset();
        self.total_in = 0;
        self.total_out = 0;
        self.init_block();
    }

    /// Change level and strategy mid-stream.
    ///
    /// When the change replaces the block producer and data has already
    /// been consumed, the buffered block is closed first so the already
    /// emitted bits stay valid under the old parameters. The closing
    /// bytes stay pending and drain on the next [`DeflateStream::compress`].
    pub fn set_params(&mut self, level: i32, strategy: Strategy) -> Result<()> {
        let level = if level == Params::DEFAULT_LEVEL { 6 } else { level };
        if !(0..=9).contains(&level) {
            return Err(Error::invalid_param("level", level as i64));
        }
        let level = level as u8;

        let new_kind = CONFIGURATION_TABLE[level as usize].kind;
        if (strategy != self.params.strategy || new_kind != self.kind) && self.total_in != 0 {
            let mut feed = Feed::new(&[]);
            let mut sink = Sink::bottomless();
            self.run_producer(&mut feed, &mut sink, FlushMode::Block);
        }

        if self.params.level != level {
            self.params.level = level;
            let cfg = &CONFIGURATION_TABLE[level as usize];
            self.m.good_match = cfg.good as usize;
            self.m.max_lazy = cfg.lazy as usize;
            self.m.nice_match = cfg.nice as usize;
            self.m.max_chain = cfg.chain as usize;
            self.kind = cfg.kind;
        }
        self.params.strategy = strategy;
        Ok(())
    }

    /// Override the matcher tuning picked from the level table.
    pub fn tune(&mut self, good: usize, lazy: usize, nice: usize, chain: usize) {
        self.m.good_match = good;
        self.m.max_lazy = lazy;
        self.m.nice_match = nice;
        self.m.max_chain = chain;
    }

    /// Prime the window with history so early matches can reference it.
    /// Valid only before any input has been consumed. A dictionary longer
    /// than the window keeps only its tail.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.total_in != 0 || self.m.lookahead != 0 {
            return Err(Error::misuse("dictionary after input was written"));
        }
        self.m.load_dictionary(dictionary);
        Ok(())
    }

    /// Compress bytes from `input` into `output`.
    ///
    /// Returns `(bytes_consumed, bytes_produced, status)`. `Done` is
    /// reported once a `Finish` flush has fully drained.
    pub fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if output.is_empty() {
            return Err(Error::NeedBuffers);
        }
        if self.status == Status::Finish && flush != FlushMode::Finish {
            return Err(Error::misuse("write after finish began"));
        }

        let old_flush = self.last_flush;
        self.last_flush = Some(flush);

        let mut feed = Feed::new(input);
        let mut sink = Sink::new(output);

        if self.writer.pending_len() > 0 {
            flush_pending(&mut self.writer, &mut sink);
            if sink.full() {
                // The retry with fresh output space must not trip the
                // duplicate-flush guard below.
                self.last_flush = None;
                self.total_out += sink.pos as u64;
                return Ok((0, sink.pos, CompressStatus::NeedsOutput));
            }
        } else if input.is_empty()
            && old_flush.is_some_and(|old| rank(flush) <= rank(old))
            && flush != FlushMode::Finish
        {
            return Err(Error::NeedBuffers);
        }

        if self.status == Status::Finish && !input.is_empty() {
            return Err(Error::misuse("input after finish began"));
        }

        if !input.is_empty()
            || self.m.lookahead != 0
            || (flush != FlushMode::None && self.status != Status::Finish)
        {
            let bstate = self.run_producer(&mut feed, &mut sink, flush);

            if matches!(bstate, BlockState::FinishStarted | BlockState::FinishDone) {
                self.status = Status::Finish;
            }
            match bstate {
                BlockState::NeedMore | BlockState::FinishStarted => {
                    if sink.full() {
                        self.last_flush = None;
                    }
                    self.total_in += feed.consumed() as u64;
                    self.total_out += sink.pos as u64;
                    let status = if sink.full() {
                        CompressStatus::NeedsOutput
                    } else {
                        CompressStatus::NeedsInput
                    };
                    return Ok((feed.consumed(), sink.pos, status));
                }
                BlockState::BlockDone => {
                    match flush {
                        FlushMode::Partial => {
                            tr_align(&mut self.writer);
                        }
                        FlushMode::Sync | FlushMode::Full => {
                            tr_stored_block(&mut self.writer, &[], false);
                            if flush == FlushMode::Full {
                                self.m.clear_hash();
                                if self.m.lookahead == 0 {
                                    self.m.strstart = 0;
                                    self.m.block_start = 0;
                                    self.m.insert = 0;
                                }
                            }
                        }
                        _ => {}
                    }
                    flush_pending(&mut self.writer, &mut sink);
                    if sink.full() {
                        self.last_flush = None;
                        self.total_in += feed.consumed() as u64;
                        self.total_out += sink.pos as u64;
                        return Ok((feed.consumed(), sink.pos, CompressStatus::NeedsOutput));
                    }
                }
                BlockState::FinishDone => {}
            }
        }

        self.total_in += feed.consumed() as u64;
        self.total_out += sink.pos as u64;
        if flush == FlushMode::Finish {
            return Ok((feed.consumed(), sink.pos, CompressStatus::Done));
        }
        Ok((feed.consumed(), sink.pos, CompressStatus::NeedsInput))
    }

    // -- block producers ---------------------------------------------------

    fn run_producer(
        &mut self,
        feed: &mut Feed<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        match (self.params.strategy, self.kind) {
            (Strategy::HuffmanOnly, _) => self.deflate_huff(feed, sink, flush),
            (Strategy::Rle, _) => self.deflate_rle(feed, sink, flush),
            (_, MatchKind::Stored) => self.deflate_stored(feed, sink, flush),
            (_, MatchKind::Fast) => self.deflate_fast(feed, sink, flush),
            (_, MatchKind::Slow) => self.deflate_slow(feed, sink, flush),
        }
    }

    /// Close the current block and bail out early when the sink filled up.
    fn flush_and_check(&mut self, sink: &mut Sink<'_>, last: bool) -> Option<BlockState> {
        self.flush_block_only(sink, last);
        if sink.full() {
            Some(if last {
                BlockState::FinishStarted
            } else {
                BlockState::NeedMore
            })
        } else {
            None
        }
    }

    /// Copy input through in stored blocks of up to 64 KiB.
    fn deflate_stored(
        &mut self,
        feed: &mut Feed<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        let max_block_size = 0xffffusize.min(self.lit_bufsize * 4 - 5);

        loop {
            if self.m.lookahead <= 1 {
                self.m.fill_window(feed);
                if self.m.lookahead == 0 && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.m.lookahead == 0 {
                    break;
                }
            }
            self.m.strstart += self.m.lookahead;
            self.m.lookahead = 0;

            // Close the block when it reaches the stored size limit.
            let max_start = self.m.block_start as usize + max_block_size;
            if self.m.strstart >= max_start {
                self.m.lookahead = self.m.strstart - max_start;
                self.m.strstart = max_start;
                if let Some(state) = self.flush_and_check(sink, false) {
                    return state;
                }
            }
            // Flush before the window would slide, or the block's bytes
            // would be copied away from under it.
            if self.m.strstart - self.m.block_start as usize >= self.m.max_dist() {
                if let Some(state) = self.flush_and_check(sink, false) {
                    return state;
                }
            }
        }
        self.m.insert = 0;
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_and_check(sink, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if self.m.strstart as isize > self.m.block_start {
            if let Some(state) = self.flush_and_check(sink, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// Greedy matching: take the first acceptable match at each position.
    fn deflate_fast(
        &mut self,
        feed: &mut Feed<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        loop {
            if self.m.lookahead < MIN_LOOKAHEAD {
                self.m.fill_window(feed);
                if self.m.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.m.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.m.lookahead >= MIN_MATCH {
                hash_head = self.m.insert_string();
            }
            if hash_head != 0 && self.m.strstart - hash_head <= self.m.max_dist() {
                self.m.match_length = self.m.longest_match(hash_head);
            }

            let bflush;
            if self.m.match_length >= MIN_MATCH {
                let dist = (self.m.strstart - self.m.match_start) as u16;
                let lc = (self.m.match_length - MIN_MATCH) as u8;
                bflush = self.tally_dist(dist, lc);

                self.m.lookahead -= self.m.match_length;

                // Hash every covered position only for short matches;
                // long matches are rare enough to just skip over.
                if self.m.match_length <= self.m.max_lazy && self.m.lookahead >= MIN_MATCH {
                    self.m.match_length -= 1;
                    loop {
                        self.m.strstart += 1;
                        self.m.insert_string();
                        self.m.match_length -= 1;
                        if self.m.match_length == 0 {
                            break;
                        }
                    }
                    self.m.strstart += 1;
                } else {
                    self.m.strstart += self.m.match_length;
                    self.m.match_length = 0;
                    self.m.reseed_hash();
                }
            } else {
                bflush = self.tally_lit(self.m.window[self.m.strstart]);
                self.m.lookahead -= 1;
                self.m.strstart += 1;
            }
            if bflush {
                if let Some(state) = self.flush_and_check(sink, false) {
                    return state;
                }
            }
        }
        self.m.insert = self.m.strstart.min(MIN_MATCH - 1);
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_and_check(sink, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.l_buf.is_empty() {
            if let Some(state) = self.flush_and_check(sink, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// Lazy matching: hold each match one position to see if the next one
    /// is longer, and emit the earlier match only when it wins.
    fn deflate_slow(
        &mut self,
        feed: &mut Feed<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        loop {
            if self.m.lookahead < MIN_LOOKAHEAD {
                self.m.fill_window(feed);
                if self.m.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.m.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.m.lookahead >= MIN_MATCH {
                hash_head = self.m.insert_string();
            }

            self.m.prev_length = self.m.match_length;
            self.m.prev_match = self.m.match_start;
            self.m.match_length = MIN_MATCH - 1;

            if hash_head != 0
                && self.m.prev_length < self.m.max_lazy
                && self.m.strstart - hash_head <= self.m.max_dist()
            {
                self.m.match_length = self.m.longest_match(hash_head);

                if self.m.match_length <= 5
                    && (self.params.strategy == Strategy::Filtered
                        || (self.m.match_length == MIN_MATCH
                            && self.m.strstart - self.m.match_start > TOO_FAR))
                {
                    // A short far-away match costs more than the literals.
                    self.m.match_length = MIN_MATCH - 1;
                }
            }

            if self.m.prev_length >= MIN_MATCH && self.m.match_length <= self.m.prev_length {
                let max_insert = self.m.strstart + self.m.lookahead - MIN_MATCH;
                let dist = (self.m.strstart - 1 - self.m.prev_match) as u16;
                let lc = (self.m.prev_length - MIN_MATCH) as u8;
                let bflush = self.tally_dist(dist, lc);

                // The match is emitted from the previous position; index
                // everything it covers, minus what is already inserted.
                self.m.lookahead -= self.m.prev_length - 1;
                self.m.prev_length -= 2;
                loop {
                    self.m.strstart += 1;
                    if self.m.strstart <= max_insert {
                        self.m.insert_string();
                    }
                    self.m.prev_length -= 1;
                    if self.m.prev_length == 0 {
                        break;
                    }
                }
                self.m.match_available = false;
                self.m.match_length = MIN_MATCH - 1;
                self.m.strstart += 1;

                if bflush {
                    if let Some(state) = self.flush_and_check(sink, false) {
                        return state;
                    }
                }
            } else if self.m.match_available {
                // The new match is longer; the previous position degrades
                // to a literal.
                let bflush = self.tally_lit(self.m.window[self.m.strstart - 1]);
                if bflush {
                    self.flush_block_only(sink, false);
                }
                self.m.strstart += 1;
                self.m.lookahead -= 1;
                if sink.full() {
                    return BlockState::NeedMore;
                }
            } else {
                self.m.match_available = true;
                self.m.strstart += 1;
                self.m.lookahead -= 1;
            }
        }
        if self.m.match_available {
            self.tally_lit(self.m.window[self.m.strstart - 1]);
            self.m.match_available = false;
        }
        self.m.insert = self.m.strstart.min(MIN_MATCH - 1);
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_and_check(sink, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.l_buf.is_empty() {
            if let Some(state) = self.flush_and_check(sink, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// Distance-one matches only: byte runs, no hash table.
    fn deflate_rle(
        &mut self,
        feed: &mut Feed<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        loop {
            if self.m.lookahead <= crate::tables::MAX_MATCH {
                self.m.fill_window(feed);
                if self.m.lookahead <= crate::tables::MAX_MATCH && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.m.lookahead == 0 {
                    break;
                }
            }

            self.m.match_length = 0;
            if self.m.lookahead >= MIN_MATCH && self.m.strstart > 0 {
                self.m.match_length = self.m.run_length();
            }

            let bflush;
            if self.m.match_length >= MIN_MATCH {
                let lc = (self.m.match_length - MIN_MATCH) as u8;
                bflush = self.tally_dist(1, lc);
                self.m.lookahead -= self.m.match_length;
                self.m.strstart += self.m.match_length;
                self.m.match_length = 0;
            } else {
                bflush = self.tally_lit(self.m.window[self.m.strstart]);
                self.m.lookahead -= 1;
                self.m.strstart += 1;
            }
            if bflush {
                if let Some(state) = self.flush_and_check(sink, false) {
                    return state;
                }
            }
        }
        self.m.insert = 0;
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_and_check(sink, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.l_buf.is_empty() {
            if let Some(state) = self.flush_and_check(sink, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    /// Every byte as a literal, no matching at all.
    fn deflate_huff(
        &mut self,
        feed: &mut Feed<'_>,
        sink: &mut Sink<'_>,
        flush: FlushMode,
    ) -> BlockState {
        loop {
            if self.m.lookahead == 0 {
                self.m.fill_window(feed);
                if self.m.lookahead == 0 {
                    if flush == FlushMode::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            self.m.match_length = 0;
            let bflush = self.tally_lit(self.m.window[self.m.strstart]);
            self.m.lookahead -= 1;
            self.m.strstart += 1;
            if bflush {
                if let Some(state) = self.flush_and_check(sink, false) {
                    return state;
                }
            }
        }
        self.m.insert = 0;
        if flush == FlushMode::Finish {
            if let Some(state) = self.flush_and_check(sink, true) {
                return state;
            }
            return BlockState::FinishDone;
        }
        if !self.l_buf.is_empty() {
            if let Some(state) = self.flush_and_check(sink, false) {
                return state;
            }
        }
        BlockState::BlockDone
    }

    // -- tally -------------------------------------------------------------

    fn init_block(&mut self) {
        for node in self.dyn_ltree.iter_mut() {
            node.freq = 0;
        }
        for node in self.dyn_dtree.iter_mut() {
            node.freq = 0;
        }
        for node in self.bl_tree.iter_mut() {
            node.freq = 0;
        }
        self.dyn_ltree[END_BLOCK].freq = 1;
        self.d_buf.clear();
        self.l_buf.clear();
    }

    /// Record a literal; returns whether the token buffer forces a flush.
    fn tally_lit(&mut self, c: u8) -> bool {
        self.d_buf.push(0);
        self.l_buf.push(c);
        self.dyn_ltree[c as usize].freq += 1;
        self.l_buf.len() == self.lit_bufsize - 1
    }

    /// Record a match; `lc` is the length minus the minimum match length.
    fn tally_dist(&mut self, dist: u16, lc: u8) -> bool {
        self.d_buf.push(dist);
        self.l_buf.push(lc);
        let (len_code, _, _) = length_to_code(lc as u16 + MIN_MATCH as u16);
        self.dyn_ltree[len_code as usize].freq += 1;
        let (dist_code, _, _) = distance_to_code(dist);
        self.dyn_dtree[dist_code as usize].freq += 1;
        self.l_buf.len() == self.lit_bufsize - 1
    }

    // -- block emission ----------------------------------------------------

    fn l_desc() -> AlphabetDesc {
        AlphabetDesc {
            static_codes: Some(fixed_litlen_codes()),
            extra: &LENGTH_EXTRA_BITS,
            extra_base: LITERALS + 1,
            elems: L_CODES,
            max_length: MAX_BITS as u8,
        }
    }

    fn d_desc() -> AlphabetDesc {
        AlphabetDesc {
            static_codes: Some(fixed_distance_codes()),
            extra: &DISTANCE_EXTRA_BITS,
            extra_base: 0,
            elems: D_CODES,
            max_length: MAX_BITS as u8,
        }
    }

    fn bl_desc() -> AlphabetDesc {
        AlphabetDesc {
            static_codes: None,
            extra: &EXTRA_BL_BITS,
            extra_base: 0,
            elems: BL_CODES,
            max_length: MAX_BL_BITS as u8,
        }
    }

    /// Emit the buffered block with the cheapest of the stored, static and
    /// dynamic representations, then start a new block.
    fn flush_block_only(&mut self, sink: &mut Sink<'_>, last: bool) {
        let stored_len = (self.m.strstart as isize - self.m.block_start) as usize;
        let buf_available = self.m.block_start >= 0;

        let mut chosen_dynamic = None;
        let (opt_lenb, static_lenb) = if self.params.level > 0 {
            let lb = huffman::build_tree(&mut self.dyn_ltree, &Self::l_desc());
            let db = huffman::build_tree(&mut self.dyn_dtree, &Self::d_desc());

            let mut opt_len = lb.opt_bits + db.opt_bits;
            let static_len = lb.static_bits + db.static_bits;

            scan_tree(&mut self.bl_tree, &self.dyn_ltree, lb.max_code);
            scan_tree(&mut self.bl_tree, &self.dyn_dtree, db.max_code);
            let blb = huffman::build_tree(&mut self.bl_tree, &Self::bl_desc());
            opt_len += blb.opt_bits;

            let mut max_blindex = BL_CODES - 1;
            while max_blindex >= 3 && self.bl_tree[CODE_LENGTH_ORDER[max_blindex]].len == 0 {
                max_blindex -= 1;
            }
            opt_len += 3 * (max_blindex as u64 + 1) + 5 + 5 + 4;

            chosen_dynamic = Some((lb.max_code, db.max_code, max_blindex));

            let mut opt_lenb = (opt_len + 3 + 7) >> 3;
            let static_lenb = (static_len + 3 + 7) >> 3;
            if static_lenb <= opt_lenb {
                opt_lenb = static_lenb;
            }
            (opt_lenb, static_lenb)
        } else {
            (stored_len as u64 + 5, stored_len as u64 + 5)
        };

        if stored_len + 4 <= opt_lenb as usize && buf_available && stored_len <= 0xffff {
            // Incompressible enough that raw bytes win.
            let start = self.m.block_start as usize;
            tr_stored_block(&mut self.writer, &self.m.window[start..start + stored_len], last);
        } else if self.params.strategy == Strategy::Fixed || static_lenb == opt_lenb {
            self.writer
                .put_bits((STATIC_TREES << 1) + last as u32, 3);
            compress_block(
                &mut self.writer,
                &self.d_buf,
                &self.l_buf,
                CodeSource::Static(fixed_litlen_codes()),
                CodeSource::Static(fixed_distance_codes()),
            );
        } else {
            let (l_max, d_max, max_blindex) =
                chosen_dynamic.expect("dynamic costing ran for level > 0");
            self.writer.put_bits((DYN_TREES << 1) + last as u32, 3);
            send_all_trees(
                &mut self.writer,
                &self.bl_tree,
                &self.dyn_ltree,
                &self.dyn_dtree,
                l_max + 1,
                d_max + 1,
                max_blindex + 1,
            );
            compress_block(
                &mut self.writer,
                &self.d_buf,
                &self.l_buf,
                CodeSource::Dynamic(&self.dyn_ltree),
                CodeSource::Dynamic(&self.dyn_dtree),
            );
        }

        self.init_block();
        if last {
            self.writer.align();
        }
        self.m.block_start = self.m.strstart as isize;
        flush_pending(&mut self.writer, sink);
    }
}

impl Compressor for DeflateStream {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        DeflateStream::compress(self, input, output, flush)
    }

    fn reset(&mut self) {
        DeflateStream::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.status == Status::Finish && self.writer.pending_len() == 0
    }
}

/// Emit a stored block: 3-bit header, byte alignment, LEN/NLEN, raw bytes.
fn tr_stored_block(writer: &mut BitWriter, buf: &[u8], last: bool) {
    writer.put_bits((STORED_BLOCK << 1) + last as u32, 3);
    writer.align();
    writer.put_u16_le(buf.len() as u16);
    writer.put_u16_le(!(buf.len() as u16));
    writer.put_bytes(buf);
}

/// Emit an empty static block so all buffered bits reach the output,
/// without padding to a byte boundary.
fn tr_align(writer: &mut BitWriter) {
    writer.put_bits(STATIC_TREES << 1, 3);
    let eob = fixed_litlen_codes()[END_BLOCK];
    writer.send_code(eob.code, eob.len);
    writer.flush_whole_bytes();
}

/// Where the per-symbol codes for a block come from.
enum CodeSource<'a> {
    Dynamic(&'a [Node]),
    Static(&'a [WireCode]),
}

impl CodeSource<'_> {
    #[inline]
    fn get(&self, sym: usize) -> (u16, u8) {
        match self {
            CodeSource::Dynamic(tree) => (tree[sym].code, tree[sym].len),
            CodeSource::Static(codes) => (codes[sym].code, codes[sym].len),
        }
    }
}

/// Encode the token buffer and the end-of-block symbol.
fn compress_block(
    writer: &mut BitWriter,
    d_buf: &[u16],
    l_buf: &[u8],
    ltree: CodeSource<'_>,
    dtree: CodeSource<'_>,
) {
    for (&dist, &lc) in d_buf.iter().zip(l_buf) {
        if dist == 0 {
            let (code, len) = ltree.get(lc as usize);
            writer.send_code(code, len);
        } else {
            let (len_code, len_extra_bits, len_extra) =
                length_to_code(lc as u16 + MIN_MATCH as u16);
            let (code, len) = ltree.get(len_code as usize);
            writer.send_code(code, len);
            if len_extra_bits > 0 {
                writer.put_bits(len_extra as u32, len_extra_bits);
            }

            let (dist_code, dist_extra_bits, dist_extra) = distance_to_code(dist);
            let (code, len) = dtree.get(dist_code as usize);
            writer.send_code(code, len);
            if dist_extra_bits > 0 {
                writer.put_bits(dist_extra as u32, dist_extra_bits);
            }
        }
    }
    let (code, len) = ltree.get(END_BLOCK);
    writer.send_code(code, len);
}

/// Tally the code-length alphabet symbols needed to describe `tree`'s
/// lengths with run-length codes 16/17/18.
fn scan_tree(bl_tree: &mut [Node], tree: &[Node], max_code: usize) {
    let mut prevlen: i32 = -1;
    let mut nextlen = tree[0].len;
    let mut count: u32 = 0;
    let (mut max_count, mut min_count) = if nextlen == 0 { (138, 3) } else { (7, 4) };

    for n in 0..=max_code {
        let curlen = nextlen;
        nextlen = if n + 1 <= max_code { tree[n + 1].len } else { 0xFF };
        count += 1;
        if count < max_count && curlen == nextlen {
            continue;
        } else if count < min_count {
            bl_tree[curlen as usize].freq += count;
        } else if curlen != 0 {
            if curlen as i32 != prevlen {
                bl_tree[curlen as usize].freq += 1;
            }
            bl_tree[REP_3_6].freq += 1;
        } else if count <= 10 {
            bl_tree[REPZ_3_10].freq += 1;
        } else {
            bl_tree[REPZ_11_138].freq += 1;
        }
        count = 0;
        prevlen = curlen as i32;
        if nextlen == 0 {
            max_count = 138;
            min_count = 3;
        } else if curlen == nextlen {
            max_count = 6;
            min_count = 3;
        } else {
            max_count = 7;
            min_count = 4;
        }
    }
}

/// Emit `tree`'s code lengths using the code-length alphabet.
fn send_tree(writer: &mut BitWriter, bl_tree: &[Node], tree: &[Node], max_code: usize) {
    let mut prevlen: i32 = -1;
    let mut nextlen = tree[0].len;
    let mut count: u32 = 0;
    let (mut max_count, mut min_count) = if nextlen == 0 { (138, 3) } else { (7, 4) };

    let send = |writer: &mut BitWriter, sym: usize| {
        writer.send_code(bl_tree[sym].code, bl_tree[sym].len);
    };

    for n in 0..=max_code {
        let curlen = nextlen;
        nextlen = if n + 1 <= max_code { tree[n + 1].len } else { 0xFF };
        count += 1;
        if count < max_count && curlen == nextlen {
            continue;
        } else if count < min_count {
            for _ in 0..count {
                send(writer, curlen as usize);
            }
        } else if curlen != 0 {
            if curlen as i32 != prevlen {
                send(writer, curlen as usize);
                count -= 1;
            }
            send(writer, REP_3_6);
            writer.put_bits(count - 3, 2);
        } else if count <= 10 {
            send(writer, REPZ_3_10);
            writer.put_bits(count - 3, 3);
        } else {
            send(writer, REPZ_11_138);
            writer.put_bits(count - 11, 7);
        }
        count = 0;
        prevlen = curlen as i32;
        if nextlen == 0 {
            max_count = 138;
            min_count = 3;
        } else if curlen == nextlen {
            max_count = 6;
            min_count = 3;
        } else {
            max_count = 7;
            min_count = 4;
        }
    }
}

/// Emit the dynamic block tree headers: counts, code-length-code lengths
/// in the permuted order, then both coded length sequences.
fn send_all_trees(
    writer: &mut BitWriter,
    bl_tree: &[Node],
    ltree: &[Node],
    dtree: &[Node],
    lcodes: usize,
    dcodes: usize,
    blcodes: usize,
) {
    writer.put_bits((lcodes - 257) as u32, 5);
    writer.put_bits((dcodes - 1) as u32, 5);
    writer.put_bits((blcodes - 4) as u32, 4);
    for rank in 0..blcodes {
        writer.put_bits(bl_tree[CODE_LENGTH_ORDER[rank]].len as u32, 3);
    }
    send_tree(writer, bl_tree, ltree, lcodes - 1);
    send_tree(writer, bl_tree, dtree, dcodes - 1);
}

/// Compress a whole buffer in one shot.
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut stream = DeflateStream::with_level(level);
    let mut out = vec![0u8; stream.upper_bound(data.len() as u64) as usize];
    let (consumed, produced, status) = stream.compress(data, &mut out, FlushMode::Finish)?;
    debug_assert_eq!(consumed, data.len());
    debug_assert_eq!(status, CompressStatus::Done);
    out.truncate(produced);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate;

    #[test]
    fn test_empty_input_static_block() {
        let compressed = deflate(b"", 6).unwrap();
        assert_eq!(compressed, [0x03, 0x00]);
        assert_eq!(inflate(&compressed).unwrap(), b"");
    }

    #[test]
    fn test_single_byte_level_one() {
        let compressed = deflate(b"a", 1).unwrap();
        assert_eq!(compressed, [0x4b, 0x04, 0x00]);
        assert_eq!(inflate(&compressed).unwrap(), b"a");
    }

    #[test]
    fn test_run_of_a() {
        let compressed = deflate(b"aaaaaaaa", 6).unwrap();
        // BFINAL set on the first (only) block.
        assert_eq!(compressed[0] & 1, 1);
        assert_eq!(inflate(&compressed).unwrap(), b"aaaaaaaa");
    }

    #[test]
    fn test_hello_world_level_nine() {
        let compressed = deflate(b"Hello, World!", 9).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_stored_level_zero() {
        let input = b"Hello, World!";
        let compressed = deflate(input, 0).unwrap();
        // 3-bit header padded to a byte, then LEN/NLEN.
        assert_eq!(compressed[0], 0x01);
        assert_eq!(compressed[1], input.len() as u8);
        assert_eq!(inflate(&compressed).unwrap(), input);
    }

    #[test]
    fn test_roundtrip_all_levels() {
        let inputs: Vec<Vec<u8>> = vec![
            b"Hello".to_vec(),
            b"The quick brown fox jumps over the lazy dog".to_vec(),
            vec![0u8; 1000],
            (0..=255).collect(),
            b"abcabcabcabcabcabcabcabc".to_vec(),
        ];

        for input in &inputs {
            for level in 0..=9 {
                let compressed = deflate(input, level).unwrap();
                let decompressed = inflate(&compressed).unwrap();
                assert_eq!(
                    &decompressed,
                    input,
                    "roundtrip failed at level {} with {} bytes",
                    level,
                    input.len()
                );
            }
        }
    }

    #[test]
    fn test_roundtrip_strategies() {
        let input = b"abcabcabc aaaaaaaaaa xyz xyz xyz 1234567890";
        for strategy in [
            Strategy::Default,
            Strategy::Filtered,
            Strategy::HuffmanOnly,
            Strategy::Rle,
            Strategy::Fixed,
        ] {
            let params = Params::new(6, 15, 8, strategy).unwrap();
            let mut stream = DeflateStream::new(params);
            let mut out = vec![0u8; stream.upper_bound(input.len() as u64) as usize];
            let (_, produced, status) = stream
                .compress(input, &mut out, FlushMode::Finish)
                .unwrap();
            assert_eq!(status, CompressStatus::Done, "{:?}", strategy);
            let decompressed = inflate(&out[..produced]).unwrap();
            assert_eq!(decompressed, input, "{:?}", strategy);
        }
    }

    #[test]
    fn test_upper_bound_holds() {
        let inputs: Vec<Vec<u8>> = vec![
            vec![],
            b"x".to_vec(),
            (0..10_000u32)
                .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
                .collect(),
            vec![7u8; 100_000],
        ];
        for input in &inputs {
            for level in [0, 1, 6, 9] {
                let stream = DeflateStream::with_level(level);
                let bound = stream.upper_bound(input.len() as u64) as usize;
                let compressed = deflate(input, level).unwrap();
                assert!(
                    compressed.len() <= bound,
                    "bound {} exceeded by {} at level {}",
                    bound,
                    compressed.len(),
                    level
                );
            }
        }
    }

    #[test]
    fn test_invalid_params() {
        assert!(Params::new(10, 15, 8, Strategy::Default).is_err());
        assert!(Params::new(-2, 15, 8, Strategy::Default).is_err());
        assert!(Params::new(6, 7, 8, Strategy::Default).is_err());
        assert!(Params::new(6, 16, 8, Strategy::Default).is_err());
        assert!(Params::new(6, 15, 0, Strategy::Default).is_err());
        assert!(Params::new(6, 15, 10, Strategy::Default).is_err());
    }

    #[test]
    fn test_wbits_eight_promoted() {
        let params = Params::new(6, 8, 8, Strategy::Default).unwrap();
        assert_eq!(params.wbits, 9);
    }

    #[test]
    fn test_write_after_finish_rejected() {
        let mut stream = DeflateStream::with_level(6);
        let mut out = vec![0u8; 64];
        let (_, _, status) = stream.compress(b"xy", &mut out, FlushMode::Finish).unwrap();
        assert_eq!(status, CompressStatus::Done);
        let err = stream.compress(b"more", &mut out, FlushMode::None).unwrap_err();
        assert!(matches!(err, Error::StreamMisuse { .. }));
    }

    #[test]
    fn test_reset_reuses_stream() {
        let mut stream = DeflateStream::with_level(6);
        let mut out = vec![0u8; 64];
        let (_, n1, _) = stream
            .compress(b"hello hello hello", &mut out, FlushMode::Finish)
            .unwrap();
        let first = out[..n1].to_vec();

        stream.reset();
        let (_, n2, _) = stream
            .compress(b"hello hello hello", &mut out, FlushMode::Finish)
            .unwrap();
        assert_eq!(&out[..n2], &first[..]);
    }

    #[test]
    fn test_pending_reports_bits() {
        let mut stream = DeflateStream::with_level(6);
        let mut out = vec![0u8; 64];
        // A sync flush pads to a byte boundary, so no bits linger.
        stream.compress(b"abc", &mut out, FlushMode::Sync).unwrap();
        let (bytes, bits) = stream.pending();
        assert_eq!(bytes, 0);
        assert_eq!(bits, 0);
    }
}
