#![no_main]

//! Fuzz target for the LZW decoder.
//!
//! Arbitrary code streams are decoded into a frame of arbitrary size. The
//! decoder must stop within the frame and never grow its table past 4096 codes.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vexgif_core::MemorySource;
use vexgif_decoder::lzw::{MAX_CODES, MAX_CODE_WIDTH};
use vexgif_decoder::{CodeReader, LzwDecoder};

#[derive(Arbitrary, Debug)]
struct LzwInput {
    min_code_size: u8,
    pixel_count: u16,
    sub_blocks: Vec<Vec<u8>>,
}

fuzz_target!(|input: LzwInput| {
    let Ok(mut decoder) = LzwDecoder::new(input.min_code_size) else {
        return;
    };

    let mut bytes = Vec::new();
    for block in input.sub_blocks.iter().take(64) {
        let len = block.len().min(255);
        bytes.push(len as u8);
        bytes.extend_from_slice(&block[..len]);
    }
    bytes.push(0);

    let mut source = MemorySource::new(bytes);
    let mut reader = CodeReader::new(&mut source);
    let mut pixels = vec![0u8; usize::from(input.pixel_count)];

    if let Ok(summary) = decoder.decode(&mut reader, &mut pixels) {
        assert!(summary.pixels <= pixels.len());
    }
    assert!(decoder.table().len() <= MAX_CODES);
    assert!(decoder.code_width() <= MAX_CODE_WIDTH);
});
