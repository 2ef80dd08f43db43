//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "ringwatch",
    version,
    about = "Find the Olympic rings bumper in a video",
    after_help = "EXAMPLES:\n  \
                  ringwatch https://www.youtube.com/watch?v=VIDEO_ID\n  \
                  ringwatch --windowed --fade-in-threshold 0.8 ./data/raw/broadcast.mp4\n  \
                  ringwatch --config ringwatch.toml --dump-references ./refs URL"
)]
pub struct Args {
    /// URL (or local file) of the video to scan
    pub url: String,

    /// TOML file overriding the built-in settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where prediction CSVs are written
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Where downloaded videos are kept
    #[arg(long, value_name = "DIR")]
    pub raw_dir: Option<PathBuf>,

    #[arg(long)]
    pub fade_in_threshold: Option<f32>,

    #[arg(long)]
    pub fade_out_threshold: Option<f32>,

    /// Decode one window at a time instead of the whole video
    #[arg(long)]
    pub windowed: bool,

    /// Write every reference sequence as an mp4 into DIR
    #[arg(long, value_name = "DIR")]
    pub dump_references: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
