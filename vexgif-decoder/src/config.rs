//! Decoder configuration.

use serde::{Deserialize, Serialize};
use vexgif_core::{Error, Result};

/// Width of the V5 Brain touchscreen in pixels.
pub const BRAIN_SCREEN_WIDTH: u16 = 480;
/// Height of the V5 Brain touchscreen in pixels.
pub const BRAIN_SCREEN_HEIGHT: u16 = 272;
/// Default limit on either screen dimension.
pub const DEFAULT_MAX_DIMENSION: u16 = 4096;

/// Options applied when a stream is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Accept `GIF87a` files. Off by default: only `GIF89a` is opened.
    pub accept_gif87a: bool,
    /// Largest logical screen width that will be opened.
    pub max_width: u16,
    /// Largest logical screen height that will be opened.
    pub max_height: u16,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            accept_gif87a: false,
            max_width: DEFAULT_MAX_DIMENSION,
            max_height: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit streams to what fits on the Brain screen.
    pub fn brain_screen() -> Self {
        Self::default().with_max_dimensions(BRAIN_SCREEN_WIDTH, BRAIN_SCREEN_HEIGHT)
    }

    /// Accept or reject `GIF87a` files.
    pub fn with_gif87a(mut self, accept: bool) -> Self {
        self.accept_gif87a = accept;
        self
    }

    /// Set the largest logical screen that will be opened.
    pub fn with_max_dimensions(mut self, width: u16, height: u16) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Check the configuration for values that can never open a stream.
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(Error::config(format!(
                "maximum dimensions must be non-zero, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rejects_gif87a() {
        let config = DecoderConfig::default();
        assert!(!config.accept_gif87a);
        assert_eq!(config.max_width, DEFAULT_MAX_DIMENSION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = DecoderConfig::brain_screen().with_gif87a(true);
        assert!(config.accept_gif87a);
        assert_eq!(config.max_width, 480);
        assert_eq!(config.max_height, 272);
    }

    #[test]
    fn test_validate_zero_dimensions() {
        let config = DecoderConfig::new().with_max_dimensions(0, 10);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
