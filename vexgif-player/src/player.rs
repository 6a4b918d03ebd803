//! Single-threaded playback loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};
use vexgif_core::{ByteSource, Result};
use vexgif_decoder::{FrameStatus, GifStream, StreamState};

use crate::clock::{Clock, SystemClock};
use crate::config::PlayerConfig;
use crate::display::Display;

/// Why playback finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every pass allowed by the loop policy was played.
    Completed,
    /// A [`StopHandle`] asked playback to end.
    Stopped,
    /// The file is malformed past some point; playback ended there.
    DecodeError,
}

/// Summary of a playback run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackReport {
    /// Passes started, including a partial last pass.
    pub passes: u32,
    pub frames_shown: u64,
    pub stop_reason: StopReason,
}

#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    frames_shown: AtomicU64,
}

/// Cloneable handle for stopping playback and reading its progress from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask playback to end before the next frame.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }

    /// Frames drawn (or handed off) so far.
    pub fn frames_shown(&self) -> u64 {
        self.shared.frames_shown.load(Ordering::Relaxed)
    }

    pub(crate) fn frame_shown(&self) -> u64 {
        self.shared.frames_shown.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Plays a stream onto a display, pacing frames with a clock.
pub struct Player<S, D, C = SystemClock> {
    stream: GifStream<S>,
    display: D,
    clock: C,
    config: PlayerConfig,
    buffer: Vec<u8>,
    handle: StopHandle,
}

impl<S: ByteSource, D: Display> Player<S, D, SystemClock> {
    /// Player paced by the system clock.
    pub fn new(stream: GifStream<S>, display: D, config: PlayerConfig) -> Result<Self> {
        Self::with_clock(stream, display, SystemClock::new(), config)
    }
}

impl<S: ByteSource, D: Display, C: Clock> Player<S, D, C> {
    /// Player paced by `clock`.
    pub fn with_clock(stream: GifStream<S>, display: D, clock: C, config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            buffer: vec![0; stream.frame_buffer_len()],
            stream,
            display,
            clock,
            config,
            handle: StopHandle::new(),
        })
    }

    /// Handle that can stop this player from another thread.
    pub fn handle(&self) -> StopHandle {
        self.handle.clone()
    }

    pub fn frames_shown(&self) -> u64 {
        self.handle.frames_shown()
    }

    pub fn stream(&self) -> &GifStream<S> {
        &self.stream
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Give back the stream and display.
    pub fn into_parts(self) -> (GifStream<S>, D) {
        (self.stream, self.display)
    }

    /// Play until the loop policy is satisfied, the stream fails, or a stop is requested.
    ///
    /// Each frame is shown for its delay minus the time spent decoding,
    /// rendering and drawing it.
    pub fn play(&mut self) -> Result<PlaybackReport> {
        if self.stream.state() != StreamState::Open {
            self.stream.rewind()?;
        }

        let mut passes = 0u32;
        let mut frames_shown = 0u64;

        loop {
            passes += 1;
            let mut pass_frames = 0usize;
            let mut started = self.clock.now();
            debug!(pass = passes, "Starting playback pass");

            loop {
                if self.handle.is_stopped() {
                    return Ok(self.report(passes, frames_shown, StopReason::Stopped));
                }

                match self.stream.next_frame()? {
                    FrameStatus::Produced => {
                        self.present()?;
                        pass_frames += 1;
                        frames_shown += 1;

                        let delay = self.config.frame_delay(self.stream.delay());
                        let spent = self.clock.now().saturating_sub(started);
                        if let Some(rest) = delay.checked_sub(spent).filter(|d| !d.is_zero()) {
                            self.clock.sleep(rest);
                        }
                        started = self.clock.now();
                    }
                    FrameStatus::Ended => break,
                    FrameStatus::Failed(err) => {
                        warn!(error = %err, pass = passes, frame = pass_frames, "Stopping playback");
                        return Ok(self.report(passes, frames_shown, StopReason::DecodeError));
                    }
                }
            }

            let limit = self.config.pass_limit(self.stream.loop_count());
            if pass_frames == 0 || limit.is_some_and(|limit| passes >= limit) {
                return Ok(self.report(passes, frames_shown, StopReason::Completed));
            }
            self.stream.rewind()?;
        }
    }

    fn present(&mut self) -> Result<()> {
        self.stream.render_frame(&mut self.buffer)?;
        self.display.draw_rgb(
            self.config.origin_x,
            self.config.origin_y,
            self.stream.width(),
            self.stream.height(),
            &self.buffer,
        )?;
        self.handle.frame_shown();
        Ok(())
    }

    fn report(&self, passes: u32, frames_shown: u64, stop_reason: StopReason) -> PlaybackReport {
        debug!(passes, frames_shown, ?stop_reason, "Playback finished");
        PlaybackReport {
            passes,
            frames_shown,
            stop_reason,
        }
    }
}

/// Total time a pass takes at the file's own delays.
pub fn pass_duration<S: ByteSource>(stream: &mut GifStream<S>, config: &PlayerConfig) -> Result<Duration> {
    if stream.state() != StreamState::Open {
        stream.rewind()?;
    }
    let mut total = Duration::ZERO;
    while let FrameStatus::Produced = stream.next_frame()? {
        total += config.frame_delay(stream.delay());
    }
    stream.rewind()?;
    Ok(total)
}
