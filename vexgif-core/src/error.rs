//! Error types for the vexgif crates.
//!
//! Errors are split by how far they reach: I/O and format errors are fatal to
//! opening a stream, decode errors only end the current animation.

use thiserror::Error;

/// Main error type for the vexgif crates.
#[derive(Error, Debug)]
pub enum Error {
    /// The byte source could not be opened, read or positioned.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a GIF this decoder accepts.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// The block or pixel stream is malformed.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An operation was called in a state that does not allow it.
    #[error("Invalid state: {operation} is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied buffer is too small.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// A screen or frame buffer could not be allocated.
    #[error("Cannot allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },

    /// The display sink rejected a frame.
    #[error("Display error: {0}")]
    Display(String),
}

/// Signature, version and descriptor validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The first three bytes are not `GIF`.
    #[error("Invalid signature: {0:?}")]
    InvalidSignature([u8; 3]),

    /// The version is not one this decoder accepts.
    #[error("Unsupported version: {0:?}")]
    UnsupportedVersion([u8; 3]),

    /// The logical screen descriptor has no global color table.
    #[error("Missing global color table")]
    MissingGlobalColorTable,

    /// The logical screen is empty or larger than the configured limit.
    #[error("Screen dimensions {width}x{height} exceed maximum {max_width}x{max_height}")]
    DimensionsExceeded {
        width: u16,
        height: u16,
        max_width: u16,
        max_height: u16,
    },

    /// The LZW minimum code size is outside 2..=8.
    #[error("Invalid LZW minimum code size: {0}")]
    InvalidCodeSize(u8),
}

/// Malformed block sequences found while decoding frames.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// A byte other than `!`, `,` or `;` where a block should start.
    #[error("Unexpected block introducer 0x{byte:02X} at offset {offset}")]
    UnexpectedBlock { byte: u8, offset: u64 },

    /// The stream ended before the trailer.
    #[error("Unexpected end of stream at offset {offset}")]
    UnexpectedEnd { offset: u64 },

    /// An image descriptor places the frame origin outside the logical screen.
    #[error("Frame origin ({left}, {top}) outside {width}x{height} screen")]
    FrameOutOfBounds {
        left: u16,
        top: u16,
        width: u16,
        height: u16,
    },

    /// Invalid LZW minimum code size in an image block.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Reading the image block failed.
    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Error::InvalidState { operation, state }
    }

    /// Check if this is a missing-file error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error only ends the current animation.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Format(FormatError::MissingGlobalColorTable);
        assert_eq!(err.to_string(), "Format error: Missing global color table");

        let err = Error::invalid_state("rewind", "open");
        assert_eq!(
            err.to_string(),
            "Invalid state: rewind is not allowed while open"
        );
    }

    #[test]
    fn test_format_error_conversion() {
        let err: Error = FormatError::InvalidCodeSize(9).into();
        assert!(matches!(err, Error::Format(FormatError::InvalidCodeSize(9))));
    }

    #[test]
    fn test_is_not_found() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(err.is_not_found());
        assert!(!Error::config("x").is_not_found());
    }

    #[test]
    fn test_out_of_memory_is_fatal() {
        let err = Error::OutOfMemory { bytes: 1usize << 40 };
        assert_eq!(err.to_string(), "Cannot allocate 1099511627776 bytes");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_is_recoverable() {
        let recoverable = Error::Decode(DecodeError::UnexpectedEnd { offset: 10 });
        assert!(recoverable.is_recoverable());

        let fatal = Error::Format(FormatError::MissingGlobalColorTable);
        assert!(!fatal.is_recoverable());
    }
}
