//! CLI subcommand implementations.

pub mod extract;
pub mod info;
pub mod play;

pub use extract::CmdExtract;
pub use info::CmdInfo;
pub use play::CmdPlay;

use anyhow::Context;
use clap::Args;
use std::path::Path;
use vexgif_core::{ByteSource, FileSource, MemorySource};
use vexgif_decoder::{DecoderConfig, GifStream};

/// Stream over whichever source the flags picked.
pub type CliStream = GifStream<Box<dyn ByteSource + Send>>;

/// How input files are opened.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceOptions {
    /// Load the whole file into memory before decoding
    #[arg(long, global = true)]
    pub memory: bool,

    /// Also accept GIF87a files
    #[arg(long, global = true)]
    pub gif87a: bool,

    /// Reject screens larger than the V5 Brain display (480x272)
    #[arg(long, global = true)]
    pub brain_screen: bool,
}

impl SourceOptions {
    pub fn decoder_config(&self) -> DecoderConfig {
        let config = if self.brain_screen {
            DecoderConfig::brain_screen()
        } else {
            DecoderConfig::default()
        };
        config.with_gif87a(self.gif87a)
    }

    /// Open `path` as a GIF stream.
    pub fn open(&self, path: &Path) -> anyhow::Result<CliStream> {
        let source: Box<dyn ByteSource + Send> = if self.memory {
            Box::new(MemorySource::open(path).with_context(|| format!("Failed to read {}", path.display()))?)
        } else {
            Box::new(FileSource::open(path).with_context(|| format!("Failed to open {}", path.display()))?)
        };
        GifStream::from_source(source, self.decoder_config())
            .with_context(|| format!("{} is not a playable GIF", path.display()))
    }
}
