//! Media engine port and encode profile
//!
//! The pipeline never talks to a concrete encoder. It depends on the
//! [`MediaEngine`] port: write named buffers into working storage, issue
//! argv-style operations against them, read named buffers back out, and
//! delete entries when done. Any compatible backend (subprocess, in-process
//! library, remote service) can sit behind it.

use async_trait::async_trait;

use crate::error::ApexResult;

pub mod ffmpeg;

pub use ffmpeg::{shared_engine, FfmpegEngine};

/// Output frame width (vertical short-video profile)
pub const OUTPUT_WIDTH: u32 = 1080;

/// Output frame height (vertical short-video profile)
pub const OUTPUT_HEIGHT: u32 = 1920;

/// Video codec used for every encode
pub const VIDEO_CODEC: &str = "libx264";

/// Encoder preset, fixed
pub const VIDEO_PRESET: &str = "fast";

/// Constant rate factor, fixed
pub const VIDEO_CRF: &str = "23";

/// Audio codec used for every encode
pub const AUDIO_CODEC: &str = "aac";

/// Audio bitrate, fixed
pub const AUDIO_BITRATE: &str = "128k";

/// Scale-to-fit-then-pad filter producing an exactly 1080x1920 frame
/// with the source centered
pub fn scale_pad_filter() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = OUTPUT_WIDTH,
        h = OUTPUT_HEIGHT
    )
}

/// Port for the external media-processing engine
///
/// Working storage is a flat namespace of named byte buffers. Entry names
/// are bare file names; the engine owns where they physically live. All
/// operations block the caller until the engine finishes that unit of
/// work, and no two operations may run concurrently against the same
/// namespace.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Write a named buffer into working storage
    async fn stage_input(&self, name: &str, bytes: &[u8]) -> ApexResult<()>;

    /// Execute one argv-style operation against working storage
    async fn run(&self, args: &[String]) -> ApexResult<()>;

    /// Read a named buffer back out of working storage
    async fn read_output(&self, name: &str) -> ApexResult<Vec<u8>>;

    /// Remove a named entry from working storage
    async fn delete_entry(&self, name: &str) -> ApexResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_pad_filter_dimensions() {
        let filter = scale_pad_filter();
        assert_eq!(
            filter,
            "scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2"
        );
    }
}
