//! ApexClip library
//!
//! Beat-synced short-video assembly: an ordered set of input clips is
//! trimmed to a uniform BPM-derived duration, concatenated, framed to a
//! 1080x1920 vertical profile, and optionally muxed against a
//! background-music track. Media processing is delegated to an opaque
//! engine behind the [`engine::MediaEngine`] port; the default adapter
//! drives the system `ffmpeg` binary.

pub mod analysis;
pub mod beat;
pub mod cli;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod server;

// Re-export commonly used types
pub use analysis::{BpmAnalyzer, TempoEstimator};
pub use beat::{beat_seconds, clip_duration, BeatPlan, ClipsPerBeat, BPM_MAX, BPM_MIN};
pub use engine::{FfmpegEngine, MediaEngine};
pub use error::{ApexError, ApexResult};
pub use pipeline::{Assembler, AssemblyOptions, AssemblyResult, AudioSource, Clip};
