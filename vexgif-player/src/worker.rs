//! Decoding on a dedicated thread.
//!
//! The worker owns its [`GifStream`] for its whole life. Frames cross to the
//! caller through a channel with room for one frame, so the decoder is never
//! more than one frame ahead of the display.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};
use vexgif_core::{ByteSource, Error, Result};
use vexgif_decoder::{FrameStatus, GifStream, StreamState};

use crate::config::PlayerConfig;
use crate::player::{PlaybackReport, StopHandle, StopReason};

/// A composited frame handed over by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    /// Pass number, starting at 1.
    pub pass: u32,
    /// Frame number within the pass, starting at 1.
    pub index: usize,
    pub width: u16,
    pub height: u16,
    /// How long the frame should stay on screen.
    pub delay: Duration,
    /// RGB pixels, 3 bytes each, row-major.
    pub rgb: Vec<u8>,
}

/// Thread that decodes a stream and hands out rendered frames.
///
/// Dropping the worker stops it and waits for the thread to exit.
pub struct PlaybackWorker {
    receiver: Option<Receiver<RenderedFrame>>,
    handle: StopHandle,
    thread: Option<JoinHandle<Result<PlaybackReport>>>,
}

impl PlaybackWorker {
    /// Start decoding `stream` on a new thread.
    pub fn spawn<S>(stream: GifStream<S>, config: PlayerConfig) -> Result<Self>
    where
        S: ByteSource + Send + 'static,
    {
        config.validate()?;

        let (sender, receiver) = mpsc::sync_channel(1);
        let handle = StopHandle::new();
        let worker_handle = handle.clone();

        let thread = thread::Builder::new()
            .name("vexgif-decode".into())
            .spawn(move || decode_loop(stream, config, sender, worker_handle))?;

        Ok(Self {
            receiver: Some(receiver),
            handle,
            thread: Some(thread),
        })
    }

    /// Wait for the next frame. `None` once playback has finished.
    pub fn recv(&self) -> Option<RenderedFrame> {
        self.receiver.as_ref()?.recv().ok()
    }

    /// Wait up to `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<RenderedFrame, RecvTimeoutError> {
        match &self.receiver {
            Some(receiver) => receiver.recv_timeout(timeout),
            None => Err(RecvTimeoutError::Disconnected),
        }
    }

    /// Iterate over frames until playback finishes.
    pub fn frames(&self) -> impl Iterator<Item = RenderedFrame> + '_ {
        std::iter::from_fn(move || self.recv())
    }

    /// Handle sharing the worker's stop flag and frame counter.
    pub fn handle(&self) -> StopHandle {
        self.handle.clone()
    }

    /// Stop decoding and wait for the thread.
    pub fn stop(mut self) -> Result<PlaybackReport> {
        self.shutdown()
    }

    /// Wait for the thread to finish on its own.
    ///
    /// Frames still in flight are discarded.
    pub fn join(mut self) -> Result<PlaybackReport> {
        let receiver = self.receiver.take();
        if let Some(receiver) = &receiver {
            while receiver.recv().is_ok() {}
        }
        self.join_thread()
    }

    fn shutdown(&mut self) -> Result<PlaybackReport> {
        self.handle.stop();
        // Unblocks a send waiting on the full slot.
        self.receiver = None;
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<PlaybackReport> {
        let Some(thread) = self.thread.take() else {
            return Err(Error::invalid_state("join", "already joined"));
        };
        thread
            .join()
            .map_err(|_| Error::Io(io::Error::new(io::ErrorKind::Other, "decode thread panicked")))?
    }
}

impl Drop for PlaybackWorker {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(err) = self.shutdown() {
                warn!(error = %err, "Playback worker ended with an error");
            }
        }
    }
}

impl std::fmt::Debug for PlaybackWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackWorker")
            .field("running", &self.thread.is_some())
            .field("frames_shown", &self.handle.frames_shown())
            .finish()
    }
}

fn decode_loop<S: ByteSource>(
    mut stream: GifStream<S>,
    config: PlayerConfig,
    sender: SyncSender<RenderedFrame>,
    handle: StopHandle,
) -> Result<PlaybackReport> {
    let mut passes = 0u32;
    let report = |passes, stop_reason| PlaybackReport {
        passes,
        frames_shown: handle.frames_shown(),
        stop_reason,
    };

    if stream.state() != StreamState::Open {
        stream.rewind()?;
    }

    let stop_reason = 'passes: loop {
        passes += 1;
        let mut index = 0usize;

        loop {
            if handle.is_stopped() {
                break 'passes StopReason::Stopped;
            }

            match stream.next_frame()? {
                FrameStatus::Produced => {
                    index += 1;
                    let mut rgb = vec![0u8; stream.frame_buffer_len()];
                    stream.render_frame(&mut rgb)?;
                    let frame = RenderedFrame {
                        pass: passes,
                        index,
                        width: stream.width(),
                        height: stream.height(),
                        delay: config.frame_delay(stream.delay()),
                        rgb,
                    };
                    if sender.send(frame).is_err() {
                        break 'passes StopReason::Stopped;
                    }
                    handle.frame_shown();
                }
                FrameStatus::Ended => break,
                FrameStatus::Failed(err) => {
                    warn!(error = %err, pass = passes, frame = index, "Decode thread stopping");
                    break 'passes StopReason::DecodeError;
                }
            }
        }

        let limit = config.pass_limit(stream.loop_count());
        if index == 0 || limit.is_some_and(|limit| passes >= limit) {
            break StopReason::Completed;
        }
        stream.rewind()?;
    };

    debug!(passes, ?stop_reason, "Decode thread finished");
    stream.close()?;
    Ok(report(passes, stop_reason))
}
