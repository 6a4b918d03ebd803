//! Terminal playback command.

use clap::Args;
use console::{style, Term};
use std::fmt::Write as FmtWrite;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use vexgif_core::{Error, Result};
use vexgif_player::{Display, Player, PlayerConfig, StopReason};

use super::SourceOptions;

/// Play a GIF in a 24-bit color terminal.
#[derive(Args, Debug)]
pub struct CmdPlay {
    /// Path to the GIF file.
    pub file: PathBuf,

    /// Number of passes, overriding the file's loop count (0 = forever).
    #[arg(long)]
    pub loops: Option<u16>,

    /// Shrink the image by this factor.
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=8))]
    pub scale: u8,

    /// Shortest time any frame stays on screen, in milliseconds.
    #[arg(long, default_value = "20")]
    pub min_delay: u64,
}

impl CmdPlay {
    pub fn player_config(&self) -> PlayerConfig {
        let config = PlayerConfig::default().with_min_frame_delay(Duration::from_millis(self.min_delay));
        match self.loops {
            Some(loops) => config.with_loop_override(loops),
            None => config,
        }
    }

    /// Execute the play command.
    pub fn run(&self, source: &SourceOptions, quiet: bool) -> anyhow::Result<()> {
        let stream = source.open(&self.file)?;
        let term = Term::stdout();
        term.hide_cursor()?;
        term.clear_screen()?;

        let mut player = Player::new(stream, TerminalDisplay::new(term.clone(), self.scale), self.player_config())?;
        let result = player.play();
        term.show_cursor()?;
        let report = result?;

        if !quiet {
            let reason = match report.stop_reason {
                StopReason::Completed => style("completed").green(),
                StopReason::Stopped => style("stopped").yellow(),
                StopReason::DecodeError => style("decode error").red(),
            };
            println!(
                "Played {} frame(s) in {} pass(es): {}",
                report.frames_shown, report.passes, reason
            );
        }
        Ok(())
    }
}

/// Draws frames with half-block characters, two image rows per terminal row.
pub struct TerminalDisplay<W> {
    out: W,
    scale: usize,
    line: String,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, scale: u8) -> Self {
        Self {
            out,
            scale: usize::from(scale.max(1)),
            line: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Display for TerminalDisplay<W> {
    fn draw_rgb(&mut self, x: i32, y: i32, width: u16, height: u16, rgb: &[u8]) -> Result<()> {
        let (width, height) = (usize::from(width), usize::from(height));
        let step = self.scale;
        let column = 1 + x.max(0) as usize / step;
        let first_row = 1 + y.max(0) as usize / (2 * step);
        let pixel = |px: usize, py: usize| {
            let at = (py * width + px) * 3;
            rgb.get(at..at + 3)
        };

        self.line.clear();
        for (row, top) in (0..height).step_by(2 * step).enumerate() {
            let _ = write!(self.line, "\x1b[{};{}H", first_row + row, column);
            for px in (0..width).step_by(step) {
                if let Some(upper) = pixel(px, top) {
                    let _ = write!(self.line, "\x1b[38;2;{};{};{}m", upper[0], upper[1], upper[2]);
                }
                match pixel(px, top + step).filter(|_| top + step < height) {
                    Some(lower) => {
                        let _ = write!(self.line, "\x1b[48;2;{};{};{}m", lower[0], lower[1], lower[2]);
                    }
                    None => self.line.push_str("\x1b[49m"),
                }
                self.line.push('\u{2580}');
            }
            self.line.push_str("\x1b[0m");
        }

        self.out
            .write_all(self.line.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|err| Error::Display(err.to_string()))
    }
}
