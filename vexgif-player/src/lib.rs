//! Animated GIF playback for the V5 Brain.
//!
//! [`Player`] drives a [`GifStream`](vexgif_decoder::GifStream) on the calling
//! thread: decode, render, draw, then sleep out the rest of the frame delay.
//! [`PlaybackWorker`] moves decoding onto its own thread and hands rendered
//! frames back one at a time.

pub mod clock;
pub mod config;
pub mod display;
pub mod player;
pub mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PlayerConfig;
pub use display::Display;
pub use player::{PlaybackReport, Player, StopHandle, StopReason};
pub use worker::{PlaybackWorker, RenderedFrame};
