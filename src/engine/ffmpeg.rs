//! FFmpeg subprocess adapter for the media engine port
//!
//! Working storage is a private scratch directory; `run` executes the
//! system `ffmpeg` binary with that directory as its working directory,
//! so argv entry names resolve without the adapter leaking paths into
//! the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::engine::MediaEngine;
use crate::error::{ApexError, ApexResult};

/// How many trailing stderr lines to keep in an error message
const STDERR_EXCERPT_LINES: usize = 8;

static SHARED: OnceCell<Arc<FfmpegEngine>> = OnceCell::const_new();

/// Lazily initialized process-wide engine
///
/// Initialization runs at most once; concurrent callers await the
/// in-flight initialization instead of starting a second one.
pub async fn shared_engine() -> ApexResult<Arc<FfmpegEngine>> {
    SHARED
        .get_or_try_init(|| async { FfmpegEngine::new().await.map(Arc::new) })
        .await
        .cloned()
}

/// Media engine backed by an `ffmpeg` subprocess and a scratch directory
pub struct FfmpegEngine {
    workspace: TempDir,
    ffmpeg_path: PathBuf,
}

impl FfmpegEngine {
    /// Create an engine using `ffmpeg` from `PATH`
    pub async fn new() -> ApexResult<Self> {
        Self::with_binary(PathBuf::from("ffmpeg")).await
    }

    /// Create an engine using an explicit ffmpeg binary
    pub async fn with_binary(ffmpeg_path: PathBuf) -> ApexResult<Self> {
        let probe = Command::new(&ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| ApexError::EncoderInitFailed {
                message: format!("could not execute {}: {}", ffmpeg_path.display(), e),
            })?;
        if !probe.status.success() {
            return Err(ApexError::EncoderInitFailed {
                message: format!(
                    "{} -version exited with {}",
                    ffmpeg_path.display(),
                    probe.status
                ),
            });
        }

        let workspace = TempDir::new().map_err(|e| ApexError::EncoderInitFailed {
            message: format!("could not create working storage: {}", e),
        })?;
        debug!("Media engine workspace: {}", workspace.path().display());

        Ok(Self {
            workspace,
            ffmpeg_path,
        })
    }

    /// Resolve an entry name inside the workspace, rejecting anything
    /// that is not a bare file name
    fn entry_path(&self, name: &str) -> ApexResult<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(ApexError::StagingFailed {
                name: name.to_string(),
                message: "entry names must be bare file names".to_string(),
            });
        }
        Ok(self.workspace.path().join(name))
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn stage_input(&self, name: &str, bytes: &[u8]) -> ApexResult<()> {
        let path = self.entry_path(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApexError::StagingFailed {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        debug!("Staged {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    async fn run(&self, args: &[String]) -> ApexResult<()> {
        debug!("ffmpeg {}", args.join(" "));
        let output = Command::new(&self.ffmpeg_path)
            .current_dir(self.workspace.path())
            .arg("-hide_banner")
            .arg("-y")
            .args(args)
            .output()
            .await
            .map_err(|e| ApexError::EncodeFailed {
                message: format!("could not spawn ffmpeg: {}", e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let start = lines.len().saturating_sub(STDERR_EXCERPT_LINES);
            let excerpt = lines[start..].join("\n");
            Err(ApexError::EncodeFailed {
                message: format!("ffmpeg exited with {}: {}", output.status, excerpt.trim()),
            })
        }
    }

    async fn read_output(&self, name: &str) -> ApexResult<Vec<u8>> {
        let path = self.entry_path(name)?;
        tokio::fs::read(&path).await.map_err(|e| ApexError::EncodeFailed {
            message: format!("could not read output '{}': {}", name, e),
        })
    }

    async fn delete_entry(&self, name: &str) -> ApexResult<()> {
        let path = self.entry_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Failed to delete working-storage entry '{}': {}", name, e);
                Err(ApexError::IoError(e))
            }
        }
    }
}
