//! GIF decoding for the V5 Brain display.
//!
//! This crate turns a GIF byte stream into composited RGB frames:
//! - Block structure: header, screen and image descriptors, extensions
//! - Variable-width LZW decompression with interlace remapping
//! - Frame disposal onto a persistent canvas
//! - A pull-based [`GifStream`] with rewind for looping
//!
//! ## Example
//!
//! ```no_run
//! use vexgif_decoder::{FrameStatus, GifStream};
//!
//! let mut gif = GifStream::open("/usd/logo.gif")?;
//! let mut rgb = vec![0u8; gif.frame_buffer_len()];
//! while let FrameStatus::Produced = gif.next_frame()? {
//!     gif.render_frame(&mut rgb)?;
//!     // draw `rgb`, then wait for `gif.delay()`
//! }
//! gif.close()?;
//! # Ok::<(), vexgif_core::Error>(())
//! ```

pub mod block;
pub mod compositor;
pub mod config;
pub mod lzw;
pub mod stream;

pub use block::{
    DisposalMethod, Extension, ExtensionHandler, GraphicControl, ImageDescriptor,
    LogicalScreenDescriptor, PlainText,
};
pub use compositor::{interlaced_line_index, Canvas, Compositor, Frame};
pub use config::{DecoderConfig, BRAIN_SCREEN_HEIGHT, BRAIN_SCREEN_WIDTH, DEFAULT_MAX_DIMENSION};
pub use lzw::{CodeReader, DecodeSummary, LzwDecoder, PixelSink, Termination};
pub use stream::{FrameStatus, GifStream, StreamState};
