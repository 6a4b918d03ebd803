#![no_main]

//! Fuzz target for the frame stream.
//!
//! Opens arbitrary bytes as a GIF and walks frames with an arbitrary mix of
//! renders and rewinds. Every failure must surface as an error, never a panic.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vexgif_core::MemorySource;
use vexgif_decoder::{DecoderConfig, FrameStatus, GifStream};

#[derive(Arbitrary, Debug)]
struct StreamInput {
    accept_gif87a: bool,
    operations: Vec<StreamOperation>,
    data: Vec<u8>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum StreamOperation {
    /// Advance to the next frame
    NextFrame,
    /// Composite the current frame into RGB
    Render,
    /// Go back to the first frame
    Rewind,
    /// Query the background color against a palette entry
    QueryBackground(u8),
}

fuzz_target!(|input: StreamInput| {
    let config = DecoderConfig::brain_screen().with_gif87a(input.accept_gif87a);
    let Ok(mut gif) = GifStream::from_source(MemorySource::new(input.data), config) else {
        return;
    };
    let mut rgb = vec![0u8; gif.frame_buffer_len()];

    for op in input.operations.into_iter().take(512) {
        match op {
            StreamOperation::NextFrame => match gif.next_frame() {
                Ok(FrameStatus::Produced) => {
                    let frame = gif.current_frame().expect("produced frame");
                    assert!(frame.left() < gif.width() && frame.top() < gif.height());
                    assert!(frame.left() + frame.width <= gif.width());
                    assert!(frame.top() + frame.height <= gif.height());
                }
                Ok(_) | Err(_) => {}
            },
            StreamOperation::Render => {
                let _ = gif.render_frame(&mut rgb);
            }
            StreamOperation::Rewind => {
                let _ = gif.rewind();
            }
            StreamOperation::QueryBackground(index) => {
                let color = gif.global_palette().get(index);
                let _ = gif.is_background_color(color);
            }
        }
    }
});
