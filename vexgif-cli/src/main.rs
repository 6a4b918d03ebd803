//! vexgif - inspect, extract and play GIF animations off-device.

mod commands;

#[cfg(test)]
#[path = "../../vexgif-decoder/tests/common/mod.rs"]
mod fixture;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CmdExtract, CmdInfo, CmdPlay, SourceOptions};

/// Command-line arguments for the vexgif tool.
#[derive(Parser, Debug)]
#[command(name = "vexgif")]
#[command(version)]
#[command(about = "Inspect, extract and play GIF animations with the V5 Brain decoder")]
#[command(long_about = "vexgif runs the same GIF decoder the robot uses, on a desktop.\n\n\
    EXAMPLES:\n    \
    vexgif info logo.gif\n    \
    vexgif info logo.gif --json\n    \
    vexgif extract logo.gif -o frames/\n    \
    vexgif play logo.gif --loops 2 --scale 2")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (decoder debug logs)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(flatten)]
    source: SourceOptions,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show screen, palette, loop and per-frame information
    Info(CmdInfo),
    /// Write every composited frame as a PPM image
    Extract(CmdExtract),
    /// Play the animation in a true-color terminal
    Play(CmdPlay),
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the flags.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match &cli.command {
        Commands::Info(cmd) => cmd.run(&cli.source),
        Commands::Extract(cmd) => cmd.run(&cli.source, cli.quiet),
        Commands::Play(cmd) => cmd.run(&cli.source, cli.quiet),
    }
}
