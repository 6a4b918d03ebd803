//! # vexgif core
//!
//! Building blocks shared by the vexgif crates:
//! - Error hierarchy
//! - Random-access byte sources (file, in-memory)
//! - RGB colors and GIF color tables

pub mod color;
pub mod error;
pub mod source;

pub use color::{ColorTable, Rgb};
pub use error::{DecodeError, Error, FormatError, Result};
pub use source::{ByteSource, FileSource, MemorySource};
