//! Clip assembly pipeline
//!
//! Takes an ordered sequence of clips and produces one vertically-framed
//! MP4: clips are optionally trimmed to a uniform beat-derived duration,
//! concatenated in order, scaled and padded to 1080x1920, and optionally
//! muxed against a background-music track. All intermediate artifacts
//! live in the media engine's working storage and are released before a
//! call returns, on success and on failure.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::beat::{clip_duration, validate_bpm, ClipsPerBeat};
use crate::engine::{
    scale_pad_filter, MediaEngine, AUDIO_BITRATE, AUDIO_CODEC, VIDEO_CODEC, VIDEO_CRF,
    VIDEO_PRESET,
};
use crate::error::{ApexError, ApexResult};

const MANIFEST_NAME: &str = "concat.txt";
const CONCAT_OUT_NAME: &str = "concat_out.mp4";
const MUXED_OUT_NAME: &str = "output.mp4";
const BGM_NAME: &str = "bgm.mp3";

/// One input clip: raw bytes plus a container-format hint
///
/// Identity is positional; the pipeline preserves the order clips are
/// handed in and never reorders them.
#[derive(Debug, Clone)]
pub struct Clip {
    data: Vec<u8>,
    extension: Option<String>,
}

impl Clip {
    /// Create a clip with an explicit extension hint
    pub fn new(data: Vec<u8>, extension: Option<String>) -> Self {
        Self {
            data,
            extension: extension.map(|e| e.to_lowercase()),
        }
    }

    /// Create a clip, deriving the extension hint from a file name
    pub fn from_file_name(file_name: &str, data: Vec<u8>) -> Self {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty());
        Self { data, extension }
    }

    /// Name under which this clip is staged, preserving its container
    /// format (generic video extension when the hint is absent)
    fn staged_name(&self, index: usize) -> String {
        let ext = self.extension.as_deref().unwrap_or("mp4");
        format!("input{}.{}", index, ext)
    }
}

/// Where background-music bytes come from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Fetch from a preview/stream URL
    Url(String),
    /// Already-fetched bytes
    Bytes(Vec<u8>),
}

/// Assembly mode and parameters
#[derive(Debug, Clone)]
pub enum AssemblyOptions {
    /// Concatenate clips in order with no trimming and no beat sync
    Simple,
    /// Trim every clip to a uniform beat-derived duration, then
    /// concatenate; optionally mux in a background track
    BeatSynced {
        bpm: u32,
        clips_per_beat: ClipsPerBeat,
        audio: Option<AudioSource>,
    },
}

/// Final assembly artifact, held in memory, all-or-nothing
#[derive(Debug)]
pub struct AssemblyResult {
    /// Encoded MP4 bytes
    pub data: Vec<u8>,
    /// Whether the optional background track made it into the output
    pub audio_muxed: bool,
}

/// Beat-synchronized clip assembler
///
/// Working-storage entry names are fixed, so a whole assembly call holds
/// an internal mutex; at most one assembly runs at a time per assembler.
pub struct Assembler {
    engine: Arc<dyn MediaEngine>,
    http: reqwest::Client,
    busy: tokio::sync::Mutex<()>,
}

impl Assembler {
    /// Create an assembler on top of a media engine
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            http: reqwest::Client::new(),
            busy: tokio::sync::Mutex::new(()),
        }
    }

    /// Assemble an ordered sequence of clips into one output video
    ///
    /// Fails with `EmptyInput` before touching working storage when no
    /// clips are supplied, and with `InvalidBpm` before any staging when
    /// a beat-synced BPM lies outside the accepted range.
    pub async fn assemble(
        &self,
        clips: &[Clip],
        options: &AssemblyOptions,
    ) -> ApexResult<AssemblyResult> {
        if clips.is_empty() {
            return Err(ApexError::EmptyInput);
        }
        if let AssemblyOptions::BeatSynced { bpm, .. } = options {
            validate_bpm(*bpm)?;
        }

        let _guard = self.busy.lock().await;

        let mut staged: Vec<String> = Vec::new();
        let result = self.assemble_inner(clips, options, &mut staged).await;
        self.release_all(&staged).await;
        result
    }

    async fn assemble_inner(
        &self,
        clips: &[Clip],
        options: &AssemblyOptions,
        staged: &mut Vec<String>,
    ) -> ApexResult<AssemblyResult> {
        // Stage every input under a deterministic name in clip order.
        let mut input_names = Vec::with_capacity(clips.len());
        for (i, clip) in clips.iter().enumerate() {
            let name = clip.staged_name(i);
            staged.push(name.clone());
            self.engine.stage_input(&name, &clip.data).await?;
            input_names.push(name);
        }

        match options {
            AssemblyOptions::Simple => {
                info!("Assembling {} clip(s), simple mode", clips.len());
                self.stage_manifest(&input_names, staged).await?;
                staged.push(CONCAT_OUT_NAME.to_string());
                self.engine
                    .run(&concat_encode_args(CONCAT_OUT_NAME))
                    .await?;
                let data = self.engine.read_output(CONCAT_OUT_NAME).await?;
                Ok(AssemblyResult {
                    data,
                    audio_muxed: false,
                })
            }
            AssemblyOptions::BeatSynced {
                bpm,
                clips_per_beat,
                audio,
            } => {
                let duration = clip_duration(*bpm, *clips_per_beat);
                info!(
                    "Assembling {} clip(s), beat-synced at {} BPM ({}s per clip)",
                    clips.len(),
                    bpm,
                    duration
                );

                let segment_names = self
                    .trim_segments(&input_names, duration, staged)
                    .await?;
                self.stage_manifest(&segment_names, staged).await?;
                staged.push(CONCAT_OUT_NAME.to_string());
                self.engine
                    .run(&concat_encode_args(CONCAT_OUT_NAME))
                    .await?;

                let mut output_name = CONCAT_OUT_NAME;
                let mut audio_muxed = false;
                if let Some(source) = audio {
                    // Background-music failures degrade to video-only
                    // output instead of failing the whole assembly.
                    match self.mux_audio(source, staged).await {
                        Ok(()) => {
                            output_name = MUXED_OUT_NAME;
                            audio_muxed = true;
                        }
                        Err(e) => {
                            warn!("Background audio mux failed, keeping video-only output: {}", e);
                        }
                    }
                }

                let data = self.engine.read_output(output_name).await?;
                Ok(AssemblyResult { data, audio_muxed })
            }
        }
    }

    /// Produce one trimmed segment of exactly `duration` seconds per
    /// input, loop-extending sources shorter than the target; engines
    /// without loop support fall back to a plain trim, which may yield a
    /// shorter segment for short sources.
    async fn trim_segments(
        &self,
        input_names: &[String],
        duration: f64,
        staged: &mut Vec<String>,
    ) -> ApexResult<Vec<String>> {
        let duration_arg = duration.to_string();
        let mut segment_names = Vec::with_capacity(input_names.len());
        for (i, input) in input_names.iter().enumerate() {
            let segment = format!("segment{}.mp4", i);
            staged.push(segment.clone());

            let loop_args = argv(&[
                "-stream_loop", "-1", "-t", &duration_arg, "-i", input, "-c", "copy", &segment,
            ]);
            if let Err(e) = self.engine.run(&loop_args).await {
                debug!("Loop-extension trim failed for {} ({}), falling back", input, e);
                let plain_args =
                    argv(&["-t", &duration_arg, "-i", input, "-c", "copy", &segment]);
                self.engine.run(&plain_args).await?;
            }
            segment_names.push(segment);
        }
        Ok(segment_names)
    }

    /// Stage the concat-demuxer manifest referencing `names` in order
    async fn stage_manifest(&self, names: &[String], staged: &mut Vec<String>) -> ApexResult<()> {
        let manifest = names
            .iter()
            .map(|n| format!("file '{}'", n))
            .collect::<Vec<_>>()
            .join("\n");
        staged.push(MANIFEST_NAME.to_string());
        self.engine
            .stage_input(MANIFEST_NAME, manifest.as_bytes())
            .await
    }

    /// Fetch, stage, and mux the background track against the
    /// concatenated video, truncating to the shorter of the two
    async fn mux_audio(&self, source: &AudioSource, staged: &mut Vec<String>) -> ApexResult<()> {
        let bytes = match source {
            AudioSource::Bytes(bytes) => bytes.clone(),
            AudioSource::Url(url) => self.fetch_audio(url).await?,
        };
        staged.push(BGM_NAME.to_string());
        self.engine.stage_input(BGM_NAME, &bytes).await?;

        staged.push(MUXED_OUT_NAME.to_string());
        let args = argv(&[
            "-i", CONCAT_OUT_NAME, "-i", BGM_NAME, "-map", "0:v", "-map", "1:a", "-c:v", "copy",
            "-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE, "-shortest", MUXED_OUT_NAME,
        ]);
        self.engine.run(&args).await
    }

    async fn fetch_audio(&self, url: &str) -> ApexResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApexError::UpstreamFailed {
                message: format!("audio fetch from {} failed: {}", url, e),
            })?;
        let bytes = response.bytes().await.map_err(|e| ApexError::UpstreamFailed {
            message: format!("audio fetch from {} failed: {}", url, e),
        })?;
        Ok(bytes.to_vec())
    }

    /// Best-effort release of every staged and intermediate entry; a
    /// failed delete never masks the primary error nor stops the rest
    async fn release_all(&self, staged: &[String]) {
        for name in staged {
            if let Err(e) = self.engine.delete_entry(name).await {
                debug!("Cleanup of '{}' skipped: {}", name, e);
            }
        }
    }
}

/// Concat-demuxer encode with the fixed vertical scale/pad profile
fn concat_encode_args(output: &str) -> Vec<String> {
    let filter = scale_pad_filter();
    argv(&[
        "-f", "concat", "-safe", "0", "-i", MANIFEST_NAME, "-vf", &filter, "-c:v", VIDEO_CODEC,
        "-preset", VIDEO_PRESET, "-crf", VIDEO_CRF, "-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE,
        output,
    ])
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests;
