//! Playback configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vexgif_core::{Error, Result};

/// How an animation is placed and repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Screen column of the image's left edge.
    pub origin_x: i32,
    /// Screen row of the image's top edge.
    pub origin_y: i32,
    /// Number of passes to play instead of the file's loop count (0 = forever).
    pub loop_override: Option<u16>,
    /// Frames with a shorter delay are shown this long.
    pub min_frame_delay_ms: u64,
    /// Upper bound on passes, applied even to endless animations.
    pub max_passes: Option<u32>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            loop_override: None,
            min_frame_delay_ms: 0,
            max_passes: None,
        }
    }
}

impl PlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw with the top-left corner at (`x`, `y`).
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self
    }

    /// Ignore the file's loop count and play `passes` times (0 = forever).
    pub fn with_loop_override(mut self, passes: u16) -> Self {
        self.loop_override = Some(passes);
        self
    }

    pub fn with_min_frame_delay(mut self, delay: Duration) -> Self {
        self.min_frame_delay_ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        self
    }

    pub fn with_max_passes(mut self, passes: u32) -> Self {
        self.max_passes = Some(passes);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_passes == Some(0) {
            return Err(Error::config("max_passes must be at least 1"));
        }
        Ok(())
    }

    /// Passes to play given the file's `NETSCAPE2.0` loop count. `None` plays forever.
    ///
    /// A file without the extension repeats until stopped, like one that
    /// asks for zero loops. `max_passes` bounds both.
    pub fn pass_limit(&self, file_loop_count: Option<u16>) -> Option<u32> {
        let passes = match self.loop_override.or(file_loop_count) {
            None | Some(0) => None,
            Some(n) => Some(u32::from(n)),
        };
        match (passes, self.max_passes) {
            (Some(p), Some(max)) => Some(p.min(max)),
            (None, max) => max,
            (p, None) => p,
        }
    }

    /// Display time for a frame that asks for `delay`.
    pub fn frame_delay(&self, delay: Duration) -> Duration {
        delay.max(Duration::from_millis(self.min_frame_delay_ms))
    }
}
