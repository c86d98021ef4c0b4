//! Default tempo estimator
//!
//! Energy-flux autocorrelation: an onset-strength envelope built from
//! rectified frame-energy differences, autocorrelated over the lag range
//! corresponding to the accepted BPM window. Deliberately simple; anything
//! smarter can replace it behind the `TempoEstimator` trait.

use crate::analysis::TempoEstimator;
use crate::beat::{BPM_MAX, BPM_MIN};
use crate::error::{ApexError, ApexResult};

/// Samples per analysis frame at 44.1 kHz (~11.6 ms)
const DEFAULT_HOP: usize = 512;

/// Shortest input the estimator accepts, in seconds
const MIN_INPUT_SECONDS: usize = 4;

/// Energy-flux autocorrelation tempo estimator
pub struct EnergyFluxEstimator {
    hop: usize,
}

impl EnergyFluxEstimator {
    pub fn new(hop: usize) -> Self {
        Self { hop }
    }
}

impl Default for EnergyFluxEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_HOP)
    }
}

impl TempoEstimator for EnergyFluxEstimator {
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> ApexResult<f64> {
        if samples.len() < sample_rate as usize * MIN_INPUT_SECONDS {
            return Err(ApexError::AnalysisFailed {
                message: format!(
                    "audio too short for tempo estimation: need at least {} seconds",
                    MIN_INPUT_SECONDS
                ),
            });
        }

        // Frame-energy envelope.
        let envelope: Vec<f64> = samples
            .chunks(self.hop)
            .map(|frame| frame.iter().map(|s| (*s as f64) * (*s as f64)).sum())
            .collect();

        // Rectified flux: only energy rises count as onset strength.
        let flux: Vec<f64> = envelope
            .windows(2)
            .map(|w| (w[1] - w[0]).max(0.0))
            .collect();
        if flux.iter().all(|f| *f <= f64::EPSILON) {
            return Err(ApexError::AnalysisFailed {
                message: "no onsets detected in audio".to_string(),
            });
        }

        let frames_per_second = sample_rate as f64 / self.hop as f64;
        let lag_min = (frames_per_second * 60.0 / BPM_MAX as f64).ceil() as usize;
        let lag_max = (frames_per_second * 60.0 / BPM_MIN as f64).floor() as usize;
        if flux.len() <= lag_max {
            return Err(ApexError::AnalysisFailed {
                message: "audio too short for tempo estimation".to_string(),
            });
        }

        let mut best_lag = lag_min;
        let mut best_score = f64::MIN;
        for lag in lag_min..=lag_max {
            let pairs = flux.len() - lag;
            let score: f64 = (0..pairs).map(|i| flux[i] * flux[i + lag]).sum::<f64>()
                / pairs as f64;
            if score > best_score {
                best_score = score;
                best_lag = lag;
            }
        }

        Ok(60.0 * frames_per_second / best_lag as f64)
    }

    fn name(&self) -> &'static str {
        "energy-flux"
    }
}
