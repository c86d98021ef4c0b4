//! CLI module for ApexClip
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// ApexClip beat-synced short-video assembler
///
/// Assembles vertically-framed, beat-aligned concatenated videos from a
/// set of input clips, with optional background music and BPM detection.
#[derive(Parser)]
#[command(name = "apexclip")]
#[command(about = "ApexClip - beat-synced short-video assembly")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Assemble input clips into one vertical video
    Assemble(args::AssembleArgs),
    /// Estimate the BPM of an audio file or URL
    Analyze(args::AnalyzeArgs),
    /// Run the audio-search proxy server
    Serve(args::ServeArgs),
}
