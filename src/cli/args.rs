//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::beat::ClipsPerBeat;

/// Arguments for the assemble command
#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Input clip file, repeatable; order is preserved in the output
    #[arg(short, long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Concatenate without trimming or beat sync
    #[arg(long, conflicts_with_all = ["bpm", "detect_bpm", "clips_per_beat"])]
    pub simple: bool,

    /// Beats per minute; defaults to 120 when neither --bpm nor
    /// --detect-bpm is given
    #[arg(long)]
    pub bpm: Option<u32>,

    /// Beats per clip (1 or 2)
    #[arg(long, default_value = "1", value_parser = ClipsPerBeat::parse)]
    pub clips_per_beat: ClipsPerBeat,

    /// Background-music source: a URL or a local file path
    #[arg(long)]
    pub audio: Option<String>,

    /// Estimate the BPM from the --audio source before assembling
    #[arg(long, requires = "audio")]
    pub detect_bpm: bool,

    /// Output file path (default: apex-clip-<timestamp>.mp4)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Audio source: a URL or a local file path
    #[arg(short, long)]
    pub input: String,
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to bind the audio proxy on
    #[arg(long, default_value = "8787")]
    pub port: u16,
}
