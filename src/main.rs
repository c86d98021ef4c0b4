//! ApexClip CLI
//!
//! Beat-synced short-video assembly from the command line.
//!
//! # Usage
//!
//! ```bash
//! apexclip assemble -i clip1.mov -i clip2.mp4 --bpm 128 --audio track.mp3
//! apexclip assemble -i clip1.mov -i clip2.mp4 --simple
//! apexclip analyze -i https://example.com/track.mp3
//! apexclip serve --port 8787
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use apexclip::cli::{commands, Cli, Commands};

/// Main entry point for the ApexClip CLI
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Execute the requested command
    match cli.command {
        Commands::Assemble(args) => {
            info!("Executing assemble command");
            commands::execute_assemble(args).await?;
        }
        Commands::Analyze(args) => {
            info!("Executing analyze command");
            commands::execute_analyze(args).await?;
        }
        Commands::Serve(args) => {
            info!("Executing serve command");
            commands::execute_serve(args).await?;
        }
    }

    Ok(())
}
