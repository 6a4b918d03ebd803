//! Frame extraction command.

use anyhow::Context;
use clap::Args;
use console::style;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vexgif_core::ByteSource;
use vexgif_decoder::{FrameStatus, GifStream};

use super::SourceOptions;

/// Write every composited frame as a binary PPM image.
#[derive(Args, Debug)]
pub struct CmdExtract {
    /// Path to the GIF file.
    pub file: PathBuf,

    /// Directory to write frames into (created if missing).
    #[arg(short, long)]
    pub output: PathBuf,

    /// Stop after this many frames.
    #[arg(long)]
    pub max_frames: Option<usize>,

    /// File name prefix for the written frames.
    #[arg(long, default_value = "frame")]
    pub prefix: String,
}

impl CmdExtract {
    /// Execute the extract command.
    pub fn run(&self, source: &SourceOptions, quiet: bool) -> anyhow::Result<()> {
        let mut stream = source.open(&self.file)?;
        fs::create_dir_all(&self.output)
            .with_context(|| format!("Failed to create {}", self.output.display()))?;

        let written = extract_frames(&mut stream, &self.output, &self.prefix, self.max_frames)?;
        if !quiet {
            println!(
                "{} {} frame(s) to {}",
                style("Extracted").green().bold(),
                written.len(),
                self.output.display()
            );
        }
        Ok(())
    }
}

/// Decode `stream` and write each frame to `dir`. Returns the written paths.
///
/// A decode error ends extraction; frames before it are kept.
pub fn extract_frames<S: ByteSource>(
    stream: &mut GifStream<S>,
    dir: &Path,
    prefix: &str,
    max_frames: Option<usize>,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut rgb = vec![0u8; stream.frame_buffer_len()];
    let mut written = Vec::new();

    while max_frames.map_or(true, |max| written.len() < max) {
        match stream.next_frame()? {
            FrameStatus::Produced => {
                stream.render_frame(&mut rgb)?;
                let path = dir.join(format!("{}_{:04}.ppm", prefix, stream.frame_index()));
                let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                write_ppm(&mut writer, stream.width(), stream.height(), &rgb)?;
                writer.flush()?;
                debug!(path = %path.display(), "Wrote frame");
                written.push(path);
            }
            FrameStatus::Ended => break,
            FrameStatus::Failed(err) => {
                warn!(error = %err, frames = written.len(), "Stopping extraction");
                break;
            }
        }
    }
    Ok(written)
}

/// Write `rgb` as a binary (P6) PPM image.
pub fn write_ppm<W: Write>(writer: &mut W, width: u16, height: u16, rgb: &[u8]) -> io::Result<()> {
    write!(writer, "P6\n{} {}\n255\n", width, height)?;
    writer.write_all(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FrameSpec, GifBuilder, BLACK, BLUE, RED, WHITE};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vexgif-extract-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn animation() -> Vec<u8> {
        GifBuilder::new(3, 2, vec![WHITE, RED, BLUE, BLACK])
            .frame(FrameSpec::solid(0, 0, 3, 2, 1).disposal(1))
            .frame(FrameSpec::solid(0, 0, 1, 1, 2))
            .frame(FrameSpec::solid(2, 1, 1, 1, 3))
            .build()
    }

    #[test]
    fn test_write_ppm() {
        let mut out = Vec::new();
        write_ppm(&mut out, 2, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(out, b"P6\n2 1\n255\n\x01\x02\x03\x04\x05\x06".to_vec());
    }

    #[test]
    fn test_extract_all_frames() {
        let dir = temp_dir("all");
        let mut stream = GifStream::from_bytes(animation()).unwrap();
        let written = extract_frames(&mut stream, &dir, "frame", None).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written[0].ends_with("frame_0001.ppm"));

        let second = fs::read(&written[1]).unwrap();
        let header = b"P6\n3 2\n255\n";
        assert!(second.starts_with(header));
        let pixels = &second[header.len()..];
        assert_eq!(pixels.len(), 3 * 2 * 3);
        assert_eq!(&pixels[0..3], &BLUE);
        assert_eq!(&pixels[3..6], &RED);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_extract_max_frames() {
        let dir = temp_dir("max");
        let mut stream = GifStream::from_bytes(animation()).unwrap();
        let written = extract_frames(&mut stream, &dir, "logo", Some(2)).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("logo_0002.ppm"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_extract_stops_at_decode_error() {
        let dir = temp_dir("error");
        let bytes = GifBuilder::new(2, 2, vec![WHITE, RED])
            .frame(FrameSpec::solid(0, 0, 2, 2, 1))
            .raw(&[0x99])
            .build();
        let mut stream = GifStream::from_bytes(bytes).unwrap();
        let written = extract_frames(&mut stream, &dir, "frame", None).unwrap();
        assert_eq!(written.len(), 1);
        fs::remove_dir_all(&dir).unwrap();
    }
}
