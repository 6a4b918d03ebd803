//! GIF inspection command.

use clap::Args;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use vexgif_core::{ByteSource, Result};
use vexgif_decoder::{DisposalMethod, FrameStatus, GifStream};

use super::SourceOptions;

/// One image block as decoded.
#[derive(Debug, Clone, Serialize)]
pub struct FrameInfo {
    /// Frame number, starting at 1.
    pub index: usize,
    pub left: u16,
    pub top: u16,
    /// Declared width.
    pub width: u16,
    /// Declared height.
    pub height: u16,
    /// Set when the frame extends past the screen and was cut.
    pub clipped: bool,
    pub delay_ms: u64,
    pub disposal: DisposalMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparent_index: Option<u8>,
    pub interlaced: bool,
    /// Entries in the local color table, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_colors: Option<usize>,
}

/// Whole-file information.
#[derive(Debug, Clone, Serialize)]
pub struct GifInfo {
    pub file: String,
    pub width: u16,
    pub height: u16,
    /// Bits per primary color.
    pub color_depth: u8,
    pub background_index: u8,
    pub global_colors: usize,
    /// `NETSCAPE2.0` loop count; absent means the animation repeats until stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<u16>,
    /// Byte offset of the first block after the global color table.
    pub animation_start: u64,
    /// Sum of all frame delays.
    pub duration_ms: u64,
    pub frames: Vec<FrameInfo>,
    /// Why decoding stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
}

impl GifInfo {
    /// Run one full decode pass over `stream`, recording every frame.
    pub fn collect<S: ByteSource>(file: String, stream: &mut GifStream<S>) -> Result<Self> {
        let mut frames = Vec::new();
        let mut decode_error = None;

        loop {
            match stream.next_frame()? {
                FrameStatus::Produced => {
                    if let Some(frame) = stream.current_frame() {
                        let descriptor = &frame.descriptor;
                        frames.push(FrameInfo {
                            index: stream.frame_index(),
                            left: descriptor.left,
                            top: descriptor.top,
                            width: descriptor.width,
                            height: descriptor.height,
                            clipped: frame.width != descriptor.width || frame.height != descriptor.height,
                            delay_ms: stream.delay().as_millis() as u64,
                            disposal: frame.control.disposal,
                            transparent_index: frame.control.transparent(),
                            interlaced: frame.interlaced(),
                            local_colors: frame.local_palette.as_ref().map(|p| p.len()),
                        });
                    }
                }
                FrameStatus::Ended => break,
                FrameStatus::Failed(err) => {
                    decode_error = Some(err.to_string());
                    break;
                }
            }
        }

        Ok(Self {
            file,
            width: stream.width(),
            height: stream.height(),
            color_depth: stream.color_depth(),
            background_index: stream.background_index(),
            global_colors: stream.global_palette().len(),
            loop_count: stream.loop_count(),
            animation_start: stream.animation_start(),
            duration_ms: frames.iter().map(|f| f.delay_ms).sum(),
            frames,
            decode_error,
        })
    }
}

/// Inspect a GIF file.
#[derive(Args, Debug)]
pub struct CmdInfo {
    /// Path to the GIF file.
    pub file: PathBuf,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,
}

impl CmdInfo {
    /// Execute the info command.
    pub fn run(&self, source: &SourceOptions) -> anyhow::Result<()> {
        let mut stream = source.open(&self.file)?;
        let info = GifInfo::collect(self.file.display().to_string(), &mut stream)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            print_info(&info);
        }
        Ok(())
    }
}

fn print_info(info: &GifInfo) {
    println!();
    println!("{}", style("GIF Information").cyan().bold());
    println!();

    println!("  {:<16} {}", style("File:").white(), info.file);
    println!("  {:<16} {}x{}", style("Screen:").white(), info.width, info.height);
    println!("  {:<16} {} bits", style("Color depth:").white(), info.color_depth);
    println!("  {:<16} {}", style("Global colors:").white(), info.global_colors);
    println!("  {:<16} {}", style("Background:").white(), info.background_index);
    println!("  {:<16} {}", style("Loops:").white(), format_loops(info.loop_count));
    println!("  {:<16} {}", style("Frames:").white(), info.frames.len());
    println!("  {:<16} {}", style("Duration:").white(), format_duration_ms(info.duration_ms));

    if !info.frames.is_empty() {
        println!();
        println!("{}", style("Frames:").cyan().bold());
        for frame in &info.frames {
            let mut extras = Vec::new();
            if let Some(index) = frame.transparent_index {
                extras.push(format!("transparent {}", index));
            }
            if frame.interlaced {
                extras.push("interlaced".to_string());
            }
            if let Some(colors) = frame.local_colors {
                extras.push(format!("{} local colors", colors));
            }
            if frame.clipped {
                extras.push("clipped".to_string());
            }
            println!(
                "  {:>4}  {:>4},{:<4} {:>4}x{:<4} {:>6} ms  {:<18} {}",
                style(format!("#{}", frame.index)).white(),
                frame.left,
                frame.top,
                frame.width,
                frame.height,
                frame.delay_ms,
                format!("{:?}", frame.disposal),
                style(extras.join(", ")).dim()
            );
        }
    }

    if let Some(err) = &info.decode_error {
        println!();
        println!("  {} {}", style("Stopped early:").yellow().bold(), err);
    }
    println!();
}

fn format_loops(loop_count: Option<u16>) -> String {
    match loop_count {
        None => "forever (no loop extension)".to_string(),
        Some(0) => "forever".to_string(),
        Some(n) => n.to_string(),
    }
}

fn format_duration_ms(ms: u64) -> String {
    if ms >= 60_000 {
        format!("{}:{:02}.{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
    } else {
        format!("{}.{:03} s", ms / 1000, ms % 1000)
    }
}
