//! Error handling module for ApexClip

use thiserror::Error;

/// Main error type for ApexClip operations
#[derive(Error, Debug)]
pub enum ApexError {
    /// No clips were supplied to the assembly pipeline
    #[error("No clips supplied: at least one input clip is required")]
    EmptyInput,

    /// BPM outside the accepted estimation range
    #[error("Invalid BPM: {bpm}. Expected a value in [60, 200]")]
    InvalidBpm { bpm: u32 },

    /// Media engine initialization error
    #[error("Failed to initialize media engine: {message}")]
    EncoderInitFailed { message: String },

    /// Could not write an entry into the engine's working storage
    #[error("Failed to stage '{name}' into working storage: {message}")]
    StagingFailed { name: String, message: String },

    /// A processing step errored inside the engine
    #[error("Encoding operation failed: {message}")]
    EncodeFailed { message: String },

    /// BPM estimation could not complete
    #[error("BPM analysis failed: {message}")]
    AnalysisFailed { message: String },

    /// The proxy's upstream errored or a credential is missing
    #[error("Upstream request failed: {message}")]
    UpstreamFailed { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for ApexClip operations
pub type ApexResult<T> = std::result::Result<T, ApexError>;
