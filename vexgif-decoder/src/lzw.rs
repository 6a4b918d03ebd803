//! Variable-width LZW decompression for GIF image data.
//!
//! Codes are packed LSB-first across the bytes of a sub-block chain. The code
//! table is an arena indexed by code: each entry stores its string length, the
//! code of its prefix string and its last byte, so expanding a code walks the
//! prefix chain backwards while writing output offsets from last to first.

use tracing::{trace, warn};
use vexgif_core::{ByteSource, FormatError, Result};

use crate::block::discard_sub_blocks;

/// Largest number of entries a GIF code table may hold.
pub const MAX_CODES: usize = 4096;
/// Widest code in bits.
pub const MAX_CODE_WIDTH: u8 = 12;
/// Smallest valid minimum code size.
pub const MIN_CODE_SIZE: u8 = 2;
/// Largest valid minimum code size.
pub const MAX_CODE_SIZE: u8 = 8;

const NO_PREFIX: u16 = 0xFFF;

/// One string in the code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Length of the string in bytes.
    pub length: u16,
    /// Code of the string without its last byte.
    pub prefix: u16,
    /// Last byte of the string.
    pub suffix: u8,
}

/// Code table seeded with one root entry per symbol plus the clear and stop codes.
#[derive(Debug, Clone)]
pub struct CodeTable {
    entries: Vec<Entry>,
    initial_len: usize,
}

impl CodeTable {
    /// Create the initial table for `min_code_size`.
    pub fn new(min_code_size: u8) -> Self {
        let roots = 1usize << min_code_size;
        let mut entries = Vec::with_capacity(MAX_CODES);
        entries.extend((0..roots).map(|symbol| Entry {
            length: 1,
            prefix: NO_PREFIX,
            suffix: symbol as u8,
        }));
        // Clear and stop codes never expand to output.
        entries.extend([Entry {
            length: 0,
            prefix: NO_PREFIX,
            suffix: 0,
        }; 2]);

        Self {
            initial_len: entries.len(),
            entries,
        }
    }

    /// Drop every entry added since construction.
    pub fn reset(&mut self) {
        self.entries.truncate(self.initial_len);
    }

    /// Number of entries, including roots and the clear/stop codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the table has reached 4096 entries.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_CODES
    }

    /// Entry for `code`, if defined.
    pub fn get(&self, code: u16) -> Option<&Entry> {
        self.entries.get(code as usize)
    }

    fn push(&mut self, prefix: u16, suffix: u8) {
        let length = self.entries[prefix as usize].length.saturating_add(1);
        self.entries.push(Entry {
            length,
            prefix,
            suffix,
        });
    }
}

/// Destination for decoded palette indices, addressed by linear pixel offset.
pub trait PixelSink {
    /// Number of pixels the image declares.
    fn pixel_count(&self) -> usize;

    /// Store `index` at linear `offset`. Offsets past the end are ignored.
    fn put(&mut self, offset: usize, index: u8);
}

impl PixelSink for [u8] {
    fn pixel_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn put(&mut self, offset: usize, index: u8) {
        if let Some(slot) = self.get_mut(offset) {
            *slot = index;
        }
    }
}

impl PixelSink for Vec<u8> {
    fn pixel_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn put(&mut self, offset: usize, index: u8) {
        self.as_mut_slice().put(offset, index);
    }
}

/// Reads LSB-first codes out of a chain of data sub-blocks.
pub struct CodeReader<'a, S: ?Sized> {
    src: &'a mut S,
    block: [u8; 255],
    block_len: usize,
    block_pos: usize,
    bits: u32,
    bit_count: u8,
    finished: bool,
}

impl<'a, S: ByteSource + ?Sized> CodeReader<'a, S> {
    /// Wrap a source positioned at the first sub-block length byte.
    pub fn new(src: &'a mut S) -> Self {
        Self {
            src,
            block: [0; 255],
            block_len: 0,
            block_pos: 0,
            bits: 0,
            bit_count: 0,
            finished: false,
        }
    }

    /// Whether the zero-length terminator (or the end of the source) was reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read a `width`-bit code. `None` means the sub-block chain has ended.
    pub fn read_code(&mut self, width: u8) -> Result<Option<u16>> {
        debug_assert!(width <= MAX_CODE_WIDTH);

        while self.bit_count < width {
            let Some(byte) = self.next_byte()? else {
                return Ok(None);
            };
            self.bits |= u32::from(byte) << self.bit_count;
            self.bit_count += 8;
        }

        let code = (self.bits & ((1u32 << width) - 1)) as u16;
        self.bits >>= width;
        self.bit_count -= width;
        Ok(Some(code))
    }

    /// Skip whatever is left of the chain, including its terminator.
    pub fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.block_pos = self.block_len;
            discard_sub_blocks(&mut *self.src)?;
            self.finished = true;
        }
        Ok(())
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        if self.block_pos == self.block_len {
            if self.finished || !self.load_block()? {
                return Ok(None);
            }
        }
        let byte = self.block[self.block_pos];
        self.block_pos += 1;
        Ok(Some(byte))
    }

    fn load_block(&mut self) -> Result<bool> {
        let mut len = [0u8; 1];
        if self.src.read(&mut len)? == 0 {
            warn!("Image data ended without a block terminator");
            self.finished = true;
            return Ok(false);
        }

        let len = len[0] as usize;
        if len == 0 {
            self.finished = true;
            return Ok(false);
        }

        let mut filled = 0;
        while filled < len {
            let n = self.src.read(&mut self.block[filled..len])?;
            if n == 0 {
                warn!(expected = len, got = filled, "Image data sub-block truncated");
                self.finished = true;
                break;
            }
            filled += n;
        }

        self.block_len = filled;
        self.block_pos = 0;
        Ok(filled > 0)
    }
}

/// Why decoding of an image stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every declared pixel was produced.
    FrameFull,
    /// The stop code was read.
    StopCode,
    /// The sub-block chain ended before the stop code.
    EndOfData,
    /// A code beyond the table was read.
    InvalidCode(u16),
}

/// Outcome of one call to [`LzwDecoder::push_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The code expanded to this many pixels.
    Emitted(usize),
    /// The table was reset.
    Cleared,
    /// Decoding of this image is over.
    Stop(Termination),
}

/// Result of decoding one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Pixels written (or dropped by the sink for lying outside it).
    pub pixels: usize,
    /// Codes consumed, including clear codes.
    pub codes: usize,
    pub termination: Termination,
}

/// GIF LZW decoder state for one image.
#[derive(Debug, Clone)]
pub struct LzwDecoder {
    min_code_size: u8,
    clear_code: u16,
    stop_code: u16,
    table: CodeTable,
    width: u8,
    prev: Option<u16>,
    prev_first: u8,
}

impl LzwDecoder {
    /// Create a decoder for a minimum code size in 2..=8.
    pub fn new(min_code_size: u8) -> std::result::Result<Self, FormatError> {
        if !(MIN_CODE_SIZE..=MAX_CODE_SIZE).contains(&min_code_size) {
            return Err(FormatError::InvalidCodeSize(min_code_size));
        }

        let clear_code = 1u16 << min_code_size;
        Ok(Self {
            min_code_size,
            clear_code,
            stop_code: clear_code + 1,
            table: CodeTable::new(min_code_size),
            width: min_code_size + 1,
            prev: None,
            prev_first: 0,
        })
    }

    /// Minimum code size from the image block.
    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }

    /// Clear code (`1 << min_code_size`).
    pub fn clear_code(&self) -> u16 {
        self.clear_code
    }

    /// Stop code (clear + 1).
    pub fn stop_code(&self) -> u16 {
        self.stop_code
    }

    /// Width in bits of the next code to read.
    pub fn code_width(&self) -> u8 {
        self.width
    }

    /// The code table.
    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    /// Return to the state right after a clear code.
    pub fn reset(&mut self) {
        self.table.reset();
        self.width = self.min_code_size + 1;
        self.prev = None;
    }

    /// Apply one code, writing its expansion to `sink` starting at `offset`.
    ///
    /// After the entry that brings the table to a power-of-two size is added,
    /// the following code is one bit wider (up to 12 bits). A full table is
    /// frozen until the next clear code.
    pub fn push_code<P: PixelSink + ?Sized>(&mut self, code: u16, sink: &mut P, offset: usize) -> Step {
        if code == self.clear_code {
            trace!(table_len = self.table.len(), "LZW clear code");
            self.reset();
            return Step::Cleared;
        }
        if code == self.stop_code {
            return Step::Stop(Termination::StopCode);
        }

        let len = self.table.len();
        let emitted = match self.prev {
            None => {
                if code >= self.clear_code {
                    return Step::Stop(Termination::InvalidCode(code));
                }
                self.emit(code, sink, offset)
            }
            Some(prev) => {
                let code_idx = code as usize;
                if code_idx > len || (code_idx == len && self.table.is_full()) {
                    return Step::Stop(Termination::InvalidCode(code));
                }

                let pushed = !self.table.is_full();
                let emitted = if code_idx == len {
                    // The string is prev's string plus its own first byte.
                    self.table.push(prev, self.prev_first);
                    self.emit(code, sink, offset)
                } else {
                    let emitted = self.emit(code, sink, offset);
                    if pushed {
                        self.table.push(prev, emitted.1);
                    }
                    emitted
                };

                if pushed && self.table.len().is_power_of_two() && self.width < MAX_CODE_WIDTH {
                    self.width += 1;
                }
                emitted
            }
        };

        self.prev = Some(code);
        self.prev_first = emitted.1;
        Step::Emitted(emitted.0)
    }

    /// Decode codes from `reader` until the sink is full, the stop code, or the end of data.
    pub fn decode<S, P>(&mut self, reader: &mut CodeReader<'_, S>, sink: &mut P) -> Result<DecodeSummary>
    where
        S: ByteSource + ?Sized,
        P: PixelSink + ?Sized,
    {
        let total = sink.pixel_count();
        let mut offset = 0usize;
        let mut codes = 0usize;

        let termination = loop {
            if offset >= total {
                break Termination::FrameFull;
            }
            let Some(code) = reader.read_code(self.width)? else {
                break Termination::EndOfData;
            };
            codes += 1;

            match self.push_code(code, sink, offset) {
                Step::Emitted(n) => offset += n,
                Step::Cleared => {}
                Step::Stop(termination) => break termination,
            }
        };

        Ok(DecodeSummary {
            pixels: offset.min(total),
            codes,
            termination,
        })
    }

    /// Write the string for `code` at `offset..offset + length`, last byte first.
    /// Returns the length and the first byte of the string.
    fn emit<P: PixelSink + ?Sized>(&self, code: u16, sink: &mut P, offset: usize) -> (usize, u8) {
        let Some(entry) = self.table.get(code) else {
            return (0, 0);
        };
        let length = entry.length as usize;

        let mut entry = *entry;
        let mut pos = length;
        while pos > 0 {
            pos -= 1;
            sink.put(offset + pos, entry.suffix);
            if entry.prefix == NO_PREFIX {
                break;
            }
            match self.table.get(entry.prefix) {
                Some(prefix) => entry = *prefix,
                None => break,
            }
        }

        (length, entry.suffix)
    }
}
