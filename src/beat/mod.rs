//! Beat and BPM arithmetic
//!
//! Everything here is a pure function of the BPM and the clips-per-beat
//! factor. Durations are kept as unrounded `f64` seconds; downstream
//! consumers format them as decimal-seconds strings for the media engine.

use crate::error::{ApexError, ApexResult};

/// Lowest BPM accepted by the pipeline and the estimator
pub const BPM_MIN: u32 = 60;

/// Highest BPM accepted by the pipeline and the estimator
pub const BPM_MAX: u32 = 200;

/// How many beats one clip occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipsPerBeat {
    /// One beat per clip
    One,
    /// Two beats per clip
    Two,
}

impl ClipsPerBeat {
    /// Multiplication factor applied to the beat duration
    pub fn factor(&self) -> u32 {
        match self {
            ClipsPerBeat::One => 1,
            ClipsPerBeat::Two => 2,
        }
    }

    /// Parse from a CLI-style string ("1" or "2")
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim() {
            "1" => Ok(ClipsPerBeat::One),
            "2" => Ok(ClipsPerBeat::Two),
            other => Err(format!("Invalid clips-per-beat: {}. Expected 1 or 2", other)),
        }
    }
}

impl Default for ClipsPerBeat {
    fn default() -> Self {
        ClipsPerBeat::One
    }
}

/// Check that a BPM lies inside the accepted range
pub fn validate_bpm(bpm: u32) -> ApexResult<u32> {
    if (BPM_MIN..=BPM_MAX).contains(&bpm) {
        Ok(bpm)
    } else {
        Err(ApexError::InvalidBpm { bpm })
    }
}

/// Seconds per beat at the given BPM
pub fn beat_seconds(bpm: u32) -> f64 {
    60.0 / bpm as f64
}

/// Target duration of one clip at the given BPM and clips-per-beat factor
pub fn clip_duration(bpm: u32, clips_per_beat: ClipsPerBeat) -> f64 {
    beat_seconds(bpm) * clips_per_beat.factor() as f64
}

/// One slot in a beat-aligned plan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatSlot {
    /// Position of the clip in the user-supplied order
    pub clip_index: usize,
    /// Offset of the slot from the start of the assembled video, in seconds
    pub start_time: f64,
    /// Target duration of the slot in seconds
    pub duration: f64,
}

/// Beat-aligned placement plan for a sequence of clips
///
/// Every slot in one plan has the same duration; clips are aligned to a
/// uniform grid derived from the BPM, not to musical downbeats within a
/// particular track.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatPlan {
    slots: Vec<BeatSlot>,
    duration: f64,
}

impl BeatPlan {
    /// Build a plan for `clip_count` clips
    ///
    /// Fails with `InvalidBpm` when the BPM lies outside `[BPM_MIN, BPM_MAX]`.
    pub fn new(clip_count: usize, bpm: u32, clips_per_beat: ClipsPerBeat) -> ApexResult<Self> {
        validate_bpm(bpm)?;
        let duration = clip_duration(bpm, clips_per_beat);
        let slots = (0..clip_count)
            .map(|i| BeatSlot {
                clip_index: i,
                start_time: i as f64 * duration,
                duration,
            })
            .collect();
        Ok(Self { slots, duration })
    }

    /// Uniform per-clip duration in seconds
    pub fn slot_duration(&self) -> f64 {
        self.duration
    }

    /// Slots in clip order
    pub fn slots(&self) -> &[BeatSlot] {
        &self.slots
    }
}
