//! DEFLATE decompression engine.
//!
//! [`InflateStream`] is an incremental raw-DEFLATE decoder built as a
//! resumable state machine: every mode can suspend on empty input or full
//! output, save the bit accumulator and in-flight length/distance, and
//! reconstitute the exact next action on the following call.
//!
//! Within one call, back-references that land in bytes produced by that
//! call resolve against the output slice; anything further back reads the
//! history window, which absorbs each call's output on the way out.
//!
//! When input and output room allow, decoding drops into a fast path that
//! resolves literal/length and distance codes in-register without
//! per-symbol state transitions.

use crate::huffman::{DecodeTable, Entry, TableKind};
use crate::tables::{fixed_decode_tables, CODE_LENGTH_ORDER};
use flatewire_core::bitstream::BitReader;
use flatewire_core::error::{Error, Result};
use flatewire_core::traits::{DecompressStatus, Decompressor, FlushMode};
use flatewire_core::window::Window;

/// Decoder modes between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Reading the 3-bit block header.
    Type,
    /// Reading a stored block's LEN/NLEN.
    Stored,
    /// Copying stored bytes through.
    Copy,
    /// Reading dynamic header counts.
    Table,
    /// Reading code-length-code lengths.
    LenLens,
    /// Reading the literal/length and distance code lengths.
    CodeLens,
    /// Reading a literal/length symbol.
    Len,
    /// Reading length extra bits.
    LenExt,
    /// Reading a distance symbol.
    Dist,
    /// Reading distance extra bits.
    DistExt,
    /// Copying a match.
    Match,
    /// Writing a literal.
    Lit,
    /// Stream complete.
    Done,
    /// Data error; only a reset recovers.
    Bad,
}

/// Incremental raw-DEFLATE decoder.
#[derive(Debug)]
pub struct InflateStream {
    mode: Mode,
    /// Processing the final block.
    last: bool,
    window: Window,
    /// Saved bit accumulator.
    hold: u64,
    bits: u8,
    /// Literal value or copy length in flight.
    length: usize,
    /// Back-reference distance in flight.
    offset: usize,
    /// Extra bits still to read for the current symbol.
    extra: u8,
    /// Decode tables; ignored while a fixed block uses the static pair.
    lencode: DecodeTable,
    distcode: DecodeTable,
    use_fixed: bool,
    /// Dynamic header: announced counts and lengths read so far.
    nlen: usize,
    ndist: usize,
    ncode: usize,
    have: usize,
    lens: [u16; 320],
    /// Allow distances reaching behind the start of the stream, writing
    /// zero bytes for the missing history.
    sane: bool,
    error: Option<Error>,
    total_in: u64,
    total_out: u64,
}

impl InflateStream {
    /// Create a decoder with the full 32 KiB window.
    pub fn new() -> Self {
        Self::with_window_bits(15).expect("default window bits are valid")
    }

    /// Create a decoder with a `1 << wbits` byte window, `wbits` in 8-15.
    /// The window must be at least as large as the one the stream was
    /// compressed with.
    pub fn with_window_bits(wbits: u8) -> Result<Self> {
        if !(8..=15).contains(&wbits) {
            return Err(Error::invalid_param("wbits", wbits as i64));
        }
        Ok(Self {
            mode: Mode::Type,
            last: false,
            window: Window::new(wbits),
            hold: 0,
            bits: 0,
            length: 0,
            offset: 0,
            extra: 0,
            lencode: DecodeTable::empty(),
            distcode: DecodeTable::empty(),
            use_fixed: false,
            nlen: 0,
            ndist: 0,
            ncode: 0,
            have: 0,
            lens: [0; 320],
            sane: true,
            error: None,
            total_in: 0,
            total_out: 0,
        })
    }

    /// Return to the freshly initialized state, keeping allocations.
    pub fn reset(&mut self) {
        self.mode = Mode::Type;
        self.last = false;
        self.window.reset();
        self.hold = 0;
        self.bits = 0;
        self.length = 0;
        self.offset = 0;
        self.extra = 0;
        self.use_fixed = false;
        self.have = 0;
        self.sane = true;
        self.error = None;
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Total bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Whether the final block has been fully decoded.
    pub fn is_finished(&self) -> bool {
        self.mode == Mode::Done
    }

    /// Preload history so back-references can reach into it. The history
    /// a raw stream starts from is whatever the producer and consumer
    /// agreed on, so this is valid at any block boundary.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.window.preload_dictionary(dictionary);
    }

    /// The current history window contents, oldest byte first.
    pub fn get_dictionary(&self) -> Vec<u8> {
        self.window.dictionary()
    }

    #[cfg(test)]
    pub(crate) fn allow_invalid_distance(&mut self) {
        self.sane = false;
    }

    fn len_entries(&self) -> &[Entry] {
        if self.use_fixed {
            fixed_decode_tables().0.entries()
        } else {
            self.lencode.entries()
        }
    }

    fn len_root(&self) -> u8 {
        if self.use_fixed {
            fixed_decode_tables().0.root_bits()
        } else {
            self.lencode.root_bits()
        }
    }

    fn dist_entries(&self) -> &[Entry] {
        if self.use_fixed {
            fixed_decode_tables().1.entries()
        } else {
            self.distcode.entries()
        }
    }

    fn dist_root(&self) -> u8 {
        if self.use_fixed {
            fixed_decode_tables().1.root_bits()
        } else {
            self.distcode.root_bits()
        }
    }

    fn fail(&mut self, br: &BitReader<'_>, e: Error) -> Error {
        let (hold, bits) = br.save();
        self.hold = hold;
        self.bits = bits;
        self.mode = Mode::Bad;
        self.error = Some(e.clone());
        e
    }

    /// Decompress bytes from `input` into `output`.
    ///
    /// Returns `(bytes_consumed, bytes_produced, status)`. With
    /// [`FlushMode::Finish`], input ending before the stream does is
    /// [`Error::UnexpectedEof`]; with other modes, a call that can make no
    /// progress returns the recoverable [`Error::NeedBuffers`].
    pub fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, DecompressStatus)> {
        if self.mode == Mode::Bad {
            return Err(self.error.clone().unwrap_or(Error::InvalidBlockType));
        }

        let mut br = BitReader::resume(input, self.hold, self.bits);
        let mut out_pos = 0usize;

        'machine: loop {
            match self.mode {
                Mode::Type => {
                    if self.last {
                        br.align();
                        self.mode = Mode::Done;
                        continue;
                    }
                    if !br.need(3) {
                        break 'machine;
                    }
                    self.last = br.peek(1) != 0;
                    br.drop_bits(1);
                    let btype = br.peek(2);
                    br.drop_bits(2);
                    match btype {
                        0 => self.mode = Mode::Stored,
                        1 => {
                            self.use_fixed = true;
                            self.mode = Mode::Len;
                        }
                        2 => self.mode = Mode::Table,
                        _ => return Err(self.fail(&br, Error::InvalidBlockType)),
                    }
                }

                Mode::Stored => {
                    br.align();
                    if !br.need(32) {
                        break 'machine;
                    }
                    let len = br.peek(16) as usize;
                    br.drop_bits(16);
                    let nlen = br.peek(16);
                    br.drop_bits(16);
                    if len != (!nlen & 0xffff) as usize {
                        return Err(self.fail(&br, Error::BadStoredLength));
                    }
                    self.length = len;
                    self.mode = Mode::Copy;
                }

                Mode::Copy => {
                    if self.length > 0 {
                        let space = output.len() - out_pos;
                        if space == 0 {
                            break 'machine;
                        }
                        let want = self.length.min(space);
                        let n = br.take_bytes(&mut output[out_pos..out_pos + want]);
                        if n == 0 {
                            break 'machine;
                        }
                        out_pos += n;
                        self.length -= n;
                        continue;
                    }
                    self.mode = Mode::Type;
                }

                Mode::Table => {
                    if !br.need(14) {
                        break 'machine;
                    }
                    self.nlen = br.peek(5) as usize + 257;
                    br.drop_bits(5);
                    self.ndist = br.peek(5) as usize + 1;
                    br.drop_bits(5);
                    self.ncode = br.peek(4) as usize + 4;
                    br.drop_bits(4);
                    if self.nlen > 286 {
                        return Err(self.fail(&br, Error::oversubscribed("literal/length")));
                    }
                    if self.ndist > 30 {
                        return Err(self.fail(&br, Error::oversubscribed("distance")));
                    }
                    self.have = 0;
                    self.mode = Mode::LenLens;
                }

                Mode::LenLens => {
                    while self.have < self.ncode {
                        if !br.need(3) {
                            break 'machine;
                        }
                        self.lens[CODE_LENGTH_ORDER[self.have]] = br.peek(3) as u16;
                        br.drop_bits(3);
                        self.have += 1;
                    }
                    while self.have < 19 {
                        self.lens[CODE_LENGTH_ORDER[self.have]] = 0;
                        self.have += 1;
                    }
                    let table =
                        DecodeTable::build(TableKind::CodeLengths, &self.lens[..19], 7);
                    self.lencode = match table {
                        Ok(t) => t,
                        Err(e) => return Err(self.fail(&br, e)),
                    };
                    self.use_fixed = false;
                    self.have = 0;
                    self.mode = Mode::CodeLens;
                }

                Mode::CodeLens => {
                    while self.have < self.nlen + self.ndist {
                        let (here, sym_bits) =
                            match peek_symbol(&mut br, self.lencode.entries(), self.lencode.root_bits()) {
                                Some(x) => x,
                                None => break 'machine,
                            };
                        if here.val < 16 {
                            br.drop_bits(sym_bits);
                            self.lens[self.have] = here.val;
                            self.have += 1;
                            continue;
                        }
                        // Repeat codes: read symbol and extra bits as one
                        // unit so a starved call resumes cleanly.
                        let (base, extra_bits, repeats_previous) = match here.val {
                            16 => (3usize, 2u8, true),
                            17 => (3, 3, false),
                            _ => (11, 7, false),
                        };
                        if !br.need(sym_bits + extra_bits) {
                            break 'machine;
                        }
                        br.drop_bits(sym_bits);
                        let mut copy = base + br.peek(extra_bits) as usize;
                        br.drop_bits(extra_bits);

                        let fill = if repeats_previous {
                            if self.have == 0 {
                                return Err(self.fail(&br, Error::InvalidCodeLengthRepeat));
                            }
                            self.lens[self.have - 1]
                        } else {
                            0
                        };
                        if self.have + copy > self.nlen + self.ndist {
                            return Err(self.fail(&br, Error::InvalidCodeLengthRepeat));
                        }
                        while copy > 0 {
                            self.lens[self.have] = fill;
                            self.have += 1;
                            copy -= 1;
                        }
                    }

                    // A block with no way to end is unusable.
                    if self.lens[256] == 0 {
                        return Err(self.fail(&br, Error::incomplete("literal/length")));
                    }

                    let lentab =
                        DecodeTable::build(TableKind::Lengths, &self.lens[..self.nlen], 9);
                    self.lencode = match lentab {
                        Ok(t) => t,
                        Err(e) => return Err(self.fail(&br, e)),
                    };
                    let disttab = DecodeTable::build(
                        TableKind::Distances,
                        &self.lens[self.nlen..self.nlen + self.ndist],
                        6,
                    );
                    self.distcode = match disttab {
                        Ok(t) => t,
                        Err(e) => return Err(self.fail(&br, e)),
                    };
                    self.use_fixed = false;
                    self.mode = Mode::Len;
                }

                Mode::Len => {
                    // Enough slack on both sides: decode in-register.
                    if br.bytes_available() >= 6 && output.len() - out_pos >= 258 {
                        let outcome = inflate_fast(
                            &mut br,
                            self.len_entries(),
                            self.len_root(),
                            self.dist_entries(),
                            self.dist_root(),
                            &self.window,
                            self.sane,
                            output,
                            &mut out_pos,
                        );
                        match outcome {
                            FastOutcome::BuffersLow => {}
                            FastOutcome::EndOfBlock => {
                                self.mode = Mode::Type;
                                continue;
                            }
                            FastOutcome::Invalid(e) => return Err(self.fail(&br, e)),
                        }
                    }

                    let (here, sym_bits) =
                        match peek_symbol(&mut br, self.len_entries(), self.len_root()) {
                            Some(x) => x,
                            None => break 'machine,
                        };
                    br.drop_bits(sym_bits);

                    if here.op == 0 {
                        self.length = here.val as usize;
                        self.mode = Mode::Lit;
                        continue;
                    }
                    if here.op & 32 != 0 {
                        self.mode = Mode::Type;
                        continue;
                    }
                    if here.op & 64 != 0 {
                        return Err(self.fail(&br, Error::InvalidLiteralLength));
                    }
                    self.length = here.val as usize;
                    self.extra = here.op & 15;
                    self.mode = Mode::LenExt;
                }

                Mode::LenExt => {
                    if self.extra > 0 {
                        if !br.need(self.extra) {
                            break 'machine;
                        }
                        self.length += br.peek(self.extra) as usize;
                        br.drop_bits(self.extra);
                    }
                    self.mode = Mode::Dist;
                }

                Mode::Dist => {
                    let (here, sym_bits) =
                        match peek_symbol(&mut br, self.dist_entries(), self.dist_root()) {
                            Some(x) => x,
                            None => break 'machine,
                        };
                    br.drop_bits(sym_bits);
                    if here.op & 64 != 0 {
                        return Err(self.fail(&br, Error::InvalidDistanceCode));
                    }
                    self.offset = here.val as usize;
                    self.extra = here.op & 15;
                    self.mode = Mode::DistExt;
                }

                Mode::DistExt => {
                    if self.extra > 0 {
                        if !br.need(self.extra) {
                            break 'machine;
                        }
                        self.offset += br.peek(self.extra) as usize;
                        br.drop_bits(self.extra);
                    }
                    self.mode = Mode::Match;
                }

                Mode::Match => {
                    if out_pos == output.len() {
                        break 'machine;
                    }
                    let space = output.len() - out_pos;

                    if self.offset > out_pos {
                        // Part of the source is in the history window.
                        let back = self.offset - out_pos;
                        if back > self.window.have() {
                            if self.sane {
                                return Err(self.fail(&br, Error::DistanceTooFarBack));
                            }
                            // Missing history reads as zeros.
                            let zeros =
                                (back - self.window.have()).min(self.length).min(space);
                            output[out_pos..out_pos + zeros].fill(0);
                            out_pos += zeros;
                            self.length -= zeros;
                        } else {
                            let seg = self.window.history_segment(back);
                            let n = seg.len().min(self.length).min(space);
                            output[out_pos..out_pos + n].copy_from_slice(&seg[..n]);
                            out_pos += n;
                            self.length -= n;
                        }
                    } else {
                        // Overlapping copy within this call's output.
                        let src = out_pos - self.offset;
                        let n = self.length.min(space);
                        for i in 0..n {
                            output[out_pos + i] = output[src + i];
                        }
                        out_pos += n;
                        self.length -= n;
                    }
                    if self.length == 0 {
                        self.mode = Mode::Len;
                    }
                }

                Mode::Lit => {
                    if out_pos == output.len() {
                        break 'machine;
                    }
                    output[out_pos] = self.length as u8;
                    out_pos += 1;
                    self.mode = Mode::Len;
                }

                Mode::Done => break 'machine,
                Mode::Bad => unreachable!("checked on entry"),
            }
        }

        // Suspend: save the accumulator and absorb this call's output
        // into the history window.
        let (hold, bits) = br.save();
        self.hold = hold;
        self.bits = bits;
        self.window.commit(&output[..out_pos]);

        let consumed = br.consumed();
        self.total_in += consumed as u64;
        self.total_out += out_pos as u64;

        if self.mode == Mode::Done {
            return Ok((consumed, out_pos, DecompressStatus::Done));
        }
        if consumed == 0 && out_pos == 0 {
            return Err(if flush == FlushMode::Finish && !output.is_empty() {
                Error::UnexpectedEof
            } else {
                Error::NeedBuffers
            });
        }
        if flush == FlushMode::Finish && consumed == input.len() && out_pos < output.len() {
            return Err(Error::UnexpectedEof);
        }
        let status = if out_pos == output.len() {
            DecompressStatus::NeedsOutput
        } else {
            DecompressStatus::NeedsInput
        };
        Ok((consumed, out_pos, status))
    }
}

impl Default for InflateStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for InflateStream {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        InflateStream::decompress(self, input, output, FlushMode::None)
    }

    fn reset(&mut self) {
        InflateStream::reset(self);
    }

    fn is_finished(&self) -> bool {
        InflateStream::is_finished(self)
    }
}

/// Look up the next symbol without consuming bits.
///
/// Pulls input only; returns the matched entry and the total bits it
/// spans, including the root-table link for sub-table codes. `None` means
/// the input starved mid-code.
fn peek_symbol(br: &mut BitReader<'_>, entries: &[Entry], root: u8) -> Option<(Entry, u8)> {
    let mut here = entries[br.peek(root) as usize];
    while here.bits > br.bits_held() {
        if !br.need(br.bits_held() + 8) {
            return None;
        }
        here = entries[br.peek(root) as usize];
    }
    if here.op != 0 && here.op & 0xf0 == 0 {
        let last = here;
        loop {
            let idx = last.val as usize + ((br.peek(last.bits + last.op) >> last.bits) as usize);
            here = entries[idx];
            if last.bits + here.bits <= br.bits_held() {
                break;
            }
            if !br.need(br.bits_held() + 8) {
                return None;
            }
        }
        Some((here, last.bits + here.bits))
    } else {
        Some((here, here.bits))
    }
}

enum FastOutcome {
    /// Input or output dropped below the fast-path margins.
    BuffersLow,
    EndOfBlock,
    Invalid(Error),
}

/// Decode literal/length and distance codes in-register while at least
/// 6 input bytes and 258 output bytes remain, the worst case one
/// iteration can consume and produce.
#[allow(clippy::too_many_arguments)]
fn inflate_fast(
    br: &mut BitReader<'_>,
    lcode: &[Entry],
    lroot: u8,
    dcode: &[Entry],
    droot: u8,
    window: &Window,
    sane: bool,
    output: &mut [u8],
    out_pos: &mut usize,
) -> FastOutcome {
    loop {
        if br.bytes_available() < 6 || output.len() - *out_pos < 258 {
            return FastOutcome::BuffersLow;
        }
        let filled = br.need(15);
        debug_assert!(filled);
        let mut here = lcode[br.peek(lroot) as usize];

        'dolen: loop {
            br.drop_bits(here.bits);
            let op = here.op;

            if op == 0 {
                output[*out_pos] = here.val as u8;
                *out_pos += 1;
                break 'dolen;
            } else if op & 16 != 0 {
                let mut len = here.val as usize;
                let len_extra = op & 15;
                if len_extra > 0 {
                    let ok = br.need(len_extra);
                    debug_assert!(ok);
                    len += br.peek(len_extra) as usize;
                    br.drop_bits(len_extra);
                }

                let filled = br.need(15);
                debug_assert!(filled);
                let mut dhere = dcode[br.peek(droot) as usize];
                'dodist: loop {
                    br.drop_bits(dhere.bits);
                    let dop = dhere.op;

                    if dop & 16 != 0 {
                        let mut dist = dhere.val as usize;
                        let dist_extra = dop & 15;
                        if dist_extra > 0 {
                            let ok = br.need(dist_extra);
                            debug_assert!(ok);
                            dist += br.peek(dist_extra) as usize;
                            br.drop_bits(dist_extra);
                        }

                        let mut remaining = len;
                        if dist > *out_pos {
                            let mut back = dist - *out_pos;
                            if back > window.have() {
                                if sane {
                                    return FastOutcome::Invalid(Error::DistanceTooFarBack);
                                }
                                let zeros = (back - window.have()).min(remaining);
                                output[*out_pos..*out_pos + zeros].fill(0);
                                *out_pos += zeros;
                                remaining -= zeros;
                                back -= zeros;
                            }
                            while back > 0 && remaining > 0 {
                                let seg = window.history_segment(back);
                                let n = seg.len().min(remaining).min(back);
                                output[*out_pos..*out_pos + n].copy_from_slice(&seg[..n]);
                                *out_pos += n;
                                remaining -= n;
                                back -= n;
                            }
                        }
                        // Remainder overlaps this call's own output.
                        if remaining > 0 {
                            debug_assert!(dist <= *out_pos);
                            let mut src = *out_pos - dist;
                            while remaining > 0 {
                                output[*out_pos] = output[src];
                                *out_pos += 1;
                                src += 1;
                                remaining -= 1;
                            }
                        }
                        break 'dodist;
                    } else if dop & 64 == 0 {
                        let idx = dhere.val as usize + br.peek(dop) as usize;
                        dhere = dcode[idx];
                        continue 'dodist;
                    } else {
                        return FastOutcome::Invalid(Error::InvalidDistanceCode);
                    }
                }
                break 'dolen;
            } else if op & 64 == 0 {
                let idx = here.val as usize + br.peek(op) as usize;
                here = lcode[idx];
                continue 'dolen;
            } else if op & 32 != 0 {
                return FastOutcome::EndOfBlock;
            } else {
                return FastOutcome::Invalid(Error::InvalidLiteralLength);
            }
        }
    }
}

/// Decompress a whole raw-DEFLATE buffer in one shot.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut stream = InflateStream::new();
    let mut out = Vec::new();
    let mut buf = vec![0u8; 32768];
    let mut pos = 0;

    loop {
        let (consumed, produced, status) =
            stream.decompress(&data[pos..], &mut buf, FlushMode::Finish)?;
        pos += consumed;
        out.extend_from_slice(&buf[..produced]);
        if status == DecompressStatus::Done {
            break;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflate_stored() {
        let compressed = [
            0x01, // BFINAL=1, BTYPE=00, padding
            0x05, 0x00, // LEN=5
            0xFA, 0xFF, // NLEN=65530
            b'H', b'e', b'l', b'l', b'o',
        ];
        assert_eq!(inflate(&compressed).unwrap(), b"Hello");
    }

    #[test]
    fn test_inflate_empty_stored() {
        let compressed = [0x01, 0x00, 0x00, 0xFF, 0xFF];
        assert!(inflate(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_inflate_empty_static() {
        // BFINAL=1, BTYPE=01, then the 7-bit end-of-block code.
        assert!(inflate(&[0x03, 0x00]).unwrap().is_empty());
    }

    #[test]
    fn test_inflate_fixed_single_literal() {
        // "a" in a static-Huffman block.
        assert_eq!(inflate(&[0x4b, 0x04, 0x00]).unwrap(), b"a");
    }

    #[test]
    fn test_inflate_bad_stored_length() {
        let compressed = [0x01, 0x05, 0x00, 0x00, 0xFF, b'H'];
        let err = inflate(&compressed).unwrap_err();
        assert_eq!(err, Error::BadStoredLength);
    }

    #[test]
    fn test_inflate_invalid_block_type() {
        // BTYPE=11 is reserved.
        let err = inflate(&[0x07]).unwrap_err();
        assert_eq!(err, Error::InvalidBlockType);
    }

    #[test]
    fn test_inflate_truncated_finish() {
        // Stored header promising 5 bytes, delivering 2.
        let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e'];
        let err = inflate(&compressed).unwrap_err();
        assert_eq!(err, Error::UnexpectedEof);
    }

    #[test]
    fn test_inflate_truncated_streaming_suspends() {
        let mut stream = InflateStream::new();
        let mut out = [0u8; 64];
        let (consumed, produced, status) = stream
            .decompress(&[0x01, 0x05, 0x00, 0xFA, 0xFF, b'H'], &mut out, FlushMode::None)
            .unwrap();
        assert_eq!(consumed, 6);
        assert_eq!(produced, 1);
        assert_eq!(status, DecompressStatus::NeedsInput);

        // The remaining stored bytes arrive later.
        let (consumed, produced, status) = stream
            .decompress(b"ello", &mut out[1..], FlushMode::Finish)
            .unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(produced, 4);
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(&out[..5], b"Hello");
    }

    #[test]
    fn test_inflate_bad_state_is_sticky() {
        let mut stream = InflateStream::new();
        let mut out = [0u8; 16];
        assert!(stream.decompress(&[0x07], &mut out, FlushMode::None).is_err());
        // Still failed, same error, until reset.
        let err = stream.decompress(&[0x00], &mut out, FlushMode::None).unwrap_err();
        assert_eq!(err, Error::InvalidBlockType);
        stream.reset();
        assert!(stream
            .decompress(&[0x01, 0x00, 0x00, 0xFF, 0xFF], &mut out, FlushMode::Finish)
            .is_ok());
    }

    #[test]
    fn test_inflate_distance_too_far() {
        // Static block: match with distance 1 before any output exists.
        // Length code 257 (len 3) = 0000001, distance code 0 = 00000.
        // Header 1|10, code 0000001, dist 00000, EOB 0000000.
        let mut bits: Vec<u8> = Vec::new();
        bits.extend([1, 1, 0]); // BFINAL, BTYPE=01
        bits.extend([0, 0, 0, 0, 0, 0, 1]); // len code 257
        bits.extend([0, 0, 0, 0, 0]); // dist code 0
        bits.extend([0; 7]); // end of block
        let mut bytes = vec![0u8; 3];
        for (i, b) in bits.iter().enumerate() {
            bytes[i / 8] |= b << (i % 8);
        }
        let err = inflate(&bytes).unwrap_err();
        assert_eq!(err, Error::DistanceTooFarBack);
    }

    #[test]
    fn test_inflate_distance_too_far_insane_writes_zeros() {
        let mut bits: Vec<u8> = Vec::new();
        bits.extend([1, 1, 0]);
        bits.extend([0, 0, 0, 0, 0, 0, 1]);
        bits.extend([0, 0, 0, 0, 0]);
        bits.extend([0; 7]);
        let mut bytes = vec![0u8; 3];
        for (i, b) in bits.iter().enumerate() {
            bytes[i / 8] |= b << (i % 8);
        }
        let mut stream = InflateStream::new();
        stream.allow_invalid_distance();
        let mut out = [0xAAu8; 8];
        let (_, produced, status) = stream
            .decompress(&bytes, &mut out, FlushMode::Finish)
            .unwrap();
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(produced, 3);
        assert_eq!(&out[..3], &[0, 0, 0]);
    }

    #[test]
    fn test_inflate_repeat_before_length_rejected() {
        // Dynamic block whose first code-length symbol is 16 (repeat).
        // HLIT=0, HDIST=0, HCLEN: enough codes that symbol 16 has a code.
        // Build: code-length code lengths give symbol 16 length 1 and
        // symbol 0 length 1; first decoded symbol is 16.
        let mut bits: Vec<u8> = Vec::new();
        bits.extend([1, 0, 1]); // BFINAL=1, BTYPE=10
        bits.extend([0, 0, 0, 0, 0]); // HLIT = 0 -> 257
        bits.extend([0, 0, 0, 0, 0]); // HDIST = 0 -> 1
        bits.extend([0, 0, 0, 0]); // HCLEN = 0 -> 4 codes: 16, 17, 18, 0
        bits.extend([1, 0, 0]); // len(16) = 1
        bits.extend([0, 0, 0]); // len(17) = 0
        bits.extend([0, 0, 0]); // len(18) = 0
        bits.extend([1, 0, 0]); // len(0) = 1
        // Code-length alphabet: symbols 0 and 16, one bit each;
        // canonical: 0 -> code 0, 16 -> code 1.
        bits.extend([1]); // decode symbol 16 first: invalid repeat
        let mut bytes = vec![0u8; bits.len().div_ceil(8)];
        for (i, b) in bits.iter().enumerate() {
            bytes[i / 8] |= b << (i % 8);
        }
        let err = inflate(&bytes).unwrap_err();
        assert_eq!(err, Error::InvalidCodeLengthRepeat);
    }

    #[test]
    fn test_inflate_oversubscribed_header_counts() {
        // HLIT = 30 -> 287 symbols, more than the alphabet has.
        let mut bits: Vec<u8> = Vec::new();
        bits.extend([1, 0, 1]);
        bits.extend([0, 1, 1, 1, 1]); // HLIT = 30
        bits.extend([0, 0, 0, 0, 0]);
        bits.extend([0, 0, 0, 0]);
        let mut bytes = vec![0u8; 3];
        for (i, b) in bits.iter().enumerate() {
            bytes[i / 8] |= b << (i % 8);
        }
        let err = inflate(&bytes).unwrap_err();
        assert!(matches!(err, Error::OversubscribedTable { .. }));
    }

    #[test]
    fn test_dictionary_roundtrip_readback() {
        let mut stream = InflateStream::new();
        stream.set_dictionary(b"some shared history");
        assert_eq!(stream.get_dictionary(), b"some shared history");
    }
}
