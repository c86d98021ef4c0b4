//! BPM acquisition
//!
//! Two entry points, one for a remote URL and one for local bytes; both
//! decode to mono f32 samples through the media engine and hand the
//! samples to a [`TempoEstimator`]. Every fetch, decode, or estimation
//! failure is normalized into `AnalysisFailed`; callers treat that as
//! non-fatal and fall back to manually entered BPM.

use std::sync::Arc;

use tracing::{debug, info};

use crate::beat::{BPM_MAX, BPM_MIN};
use crate::engine::MediaEngine;
use crate::error::{ApexError, ApexResult};

pub mod energy_flux;

pub use energy_flux::EnergyFluxEstimator;

/// Sample rate the engine decodes to before estimation
const ANALYSIS_SAMPLE_RATE: u32 = 44_100;

const ANALYSIS_INPUT_NAME: &str = "bpm_input";
const ANALYSIS_PCM_NAME: &str = "bpm_pcm.raw";

/// Tempo estimation over decoded audio samples
///
/// Implementations search the accepted range only; the analyzer still
/// validates the returned value.
pub trait TempoEstimator: Send + Sync {
    /// Estimate beats per minute from mono samples
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> ApexResult<f64>;

    /// Short implementation name for diagnostics
    fn name(&self) -> &'static str;
}

/// BPM analyzer: fetch, decode, estimate
pub struct BpmAnalyzer {
    engine: Arc<dyn MediaEngine>,
    estimator: Box<dyn TempoEstimator>,
    http: reqwest::Client,
}

impl BpmAnalyzer {
    /// Create an analyzer with the default estimator
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self::with_estimator(engine, Box::new(EnergyFluxEstimator::default()))
    }

    /// Create an analyzer with an explicit estimator
    pub fn with_estimator(engine: Arc<dyn MediaEngine>, estimator: Box<dyn TempoEstimator>) -> Self {
        Self {
            engine,
            estimator,
            http: reqwest::Client::new(),
        }
    }

    /// Estimate the BPM of a remote audio source
    pub async fn analyze_url(&self, url: &str) -> ApexResult<u32> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApexError::AnalysisFailed {
                message: format!("could not fetch audio from {}: {}", url, e),
            })?;
        let bytes = response.bytes().await.map_err(|e| ApexError::AnalysisFailed {
            message: format!("could not fetch audio from {}: {}", url, e),
        })?;
        self.analyze_bytes(&bytes).await
    }

    /// Estimate the BPM of an in-memory audio source
    pub async fn analyze_bytes(&self, bytes: &[u8]) -> ApexResult<u32> {
        let result = self.analyze_inner(bytes).await;
        self.release().await;
        result
    }

    async fn analyze_inner(&self, bytes: &[u8]) -> ApexResult<u32> {
        self.engine
            .stage_input(ANALYSIS_INPUT_NAME, bytes)
            .await
            .map_err(normalize)?;

        let sample_rate = ANALYSIS_SAMPLE_RATE.to_string();
        let decode_args: Vec<String> = [
            "-i",
            ANALYSIS_INPUT_NAME,
            "-f",
            "f32le",
            "-ac",
            "1",
            "-ar",
            &sample_rate,
            ANALYSIS_PCM_NAME,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        self.engine.run(&decode_args).await.map_err(normalize)?;

        let pcm = self
            .engine
            .read_output(ANALYSIS_PCM_NAME)
            .await
            .map_err(normalize)?;
        let samples: Vec<f32> = pcm
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        debug!("Decoded {} samples for analysis", samples.len());

        let bpm = self
            .estimator
            .estimate(&samples, ANALYSIS_SAMPLE_RATE)
            .map_err(normalize)?;
        let rounded = bpm.round() as u32;
        if !(BPM_MIN..=BPM_MAX).contains(&rounded) {
            return Err(ApexError::AnalysisFailed {
                message: format!(
                    "estimator '{}' returned {} BPM, outside [{}, {}]",
                    self.estimator.name(),
                    rounded,
                    BPM_MIN,
                    BPM_MAX
                ),
            });
        }

        info!("Estimated {} BPM via '{}'", rounded, self.estimator.name());
        Ok(rounded)
    }

    async fn release(&self) {
        for name in [ANALYSIS_INPUT_NAME, ANALYSIS_PCM_NAME] {
            if let Err(e) = self.engine.delete_entry(name).await {
                debug!("Cleanup of '{}' skipped: {}", name, e);
            }
        }
    }
}

/// Collapse any underlying failure into the analysis category
fn normalize(error: ApexError) -> ApexError {
    match error {
        ApexError::AnalysisFailed { .. } => error,
        other => ApexError::AnalysisFailed {
            message: other.to_string(),
        },
    }
}
