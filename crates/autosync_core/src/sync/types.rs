//! Core types for marker-based offset estimation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SyncSettings;

/// Default analysis window: first five minutes of each file.
pub const DEFAULT_ANALYSIS_WINDOW_SECS: u32 = 300;

/// Sample rate of the raw PCM passed between producer and consumer.
pub const ANALYSIS_SAMPLE_RATE: u32 = 8000;

/// Minimum markers per stream for a search to be meaningful.
pub const MIN_MARKERS: usize = 5;

/// Coarse match count below which a result is flagged as low confidence.
pub const LOW_CONFIDENCE_MATCHES: u32 = 3;

/// Which audio stream of an input the producer decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackSelector {
    /// Let ffmpeg pick the best audio stream (video is dropped).
    #[default]
    BestAvailable,
    /// Map a specific container track id (`-map 0:<id>`).
    Explicit(u32),
}

impl fmt::Display for TrackSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSelector::BestAvailable => write!(f, "default audio"),
            TrackSelector::Explicit(id) => write!(f, "track {}", id),
        }
    }
}

/// Which side of the comparison a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamRole {
    /// Audio from the source video.
    Reference,
    /// Audio from the language file being imported.
    Candidate,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRole::Reference => write!(f, "reference"),
            StreamRole::Candidate => write!(f, "candidate"),
        }
    }
}

/// Per-kind marker counts, kept for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarkerCounts {
    pub silence_starts: usize,
    pub silence_ends: usize,
    pub transients: usize,
}

impl MarkerCounts {
    /// Total number of markers.
    pub fn total(&self) -> usize {
        self.silence_starts + self.silence_ends + self.transients
    }
}

impl fmt::Display for MarkerCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} silence_start, {} silence_end, {} transients",
            self.silence_starts, self.silence_ends, self.transients
        )
    }
}

/// All markers detected in one stream.
///
/// Timestamps are seconds from the start of the analysis window. Order is
/// irrelevant and duplicates are kept: repeated events add match density.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    markers: Vec<f64>,
    counts: MarkerCounts,
}

impl MarkerSet {
    /// Build a set from the three marker kinds.
    pub fn from_parts(silence_starts: Vec<f64>, silence_ends: Vec<f64>, transients: Vec<f64>) -> Self {
        let counts = MarkerCounts {
            silence_starts: silence_starts.len(),
            silence_ends: silence_ends.len(),
            transients: transients.len(),
        };
        let mut markers = silence_starts;
        markers.extend(silence_ends);
        markers.extend(transients);
        Self { markers, counts }
    }

    /// Build a set from untyped timestamps (counted as transients).
    pub fn from_times(times: Vec<f64>) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), times)
    }

    /// Marker timestamps in seconds.
    pub fn times(&self) -> &[f64] {
        &self.markers
    }

    /// Breakdown by marker kind.
    pub fn counts(&self) -> MarkerCounts {
        self.counts
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Check if no markers were found.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Best candidate of one search phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult<S> {
    /// Offset in milliseconds.
    pub offset_ms: i32,
    /// Match count (coarse) or accumulated proximity weight (fine phases).
    pub score: S,
}

/// Outcome of the three-phase search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub coarse: PhaseResult<u32>,
    pub fine: PhaseResult<f64>,
    pub ultra_fine: PhaseResult<f64>,
}

impl SearchResult {
    /// Final offset in milliseconds (the ultra-fine winner).
    pub fn offset_ms(&self) -> i32 {
        self.ultra_fine.offset_ms
    }

    /// Whether too few coarse matches back the result.
    pub fn is_low_confidence(&self) -> bool {
        self.coarse.score < LOW_CONFIDENCE_MATCHES
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "coarse {}ms ({} matches), fine {}ms (score {:.2}), ultra-fine {}ms (score {:.2})",
            self.coarse.offset_ms,
            self.coarse.score,
            self.fine.offset_ms,
            self.fine.score,
            self.ultra_fine.offset_ms,
            self.ultra_fine.score
        )
    }
}

/// Wall-clock time spent in each stage of an estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageTimings {
    /// Both extraction pipelines, start to join.
    pub extraction: Duration,
    /// Marker parsing and offset search.
    pub search: Duration,
}

/// Successful offset estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetEstimate {
    /// Offset to apply to the candidate track, in milliseconds.
    pub offset_ms: i32,
    /// Per-phase offsets and scores.
    pub search: SearchResult,
    /// Source track used as the reference signal.
    pub reference_track: TrackSelector,
    /// Every source audio track was in a target language.
    pub reference_track_targeted: bool,
    /// Marker breakdown of the reference stream.
    pub reference_markers: MarkerCounts,
    /// Marker breakdown of the candidate stream.
    pub candidate_markers: MarkerCounts,
    /// Stage timings.
    pub timings: StageTimings,
}

impl OffsetEstimate {
    /// Whether the result should be treated as unreliable.
    pub fn is_low_confidence(&self) -> bool {
        self.search.is_low_confidence() || self.reference_track_targeted
    }
}

impl fmt::Display for OffsetEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}ms [{}]", self.offset_ms, self.search)?;
        if self.is_low_confidence() {
            write!(f, " (low confidence)")?;
        }
        Ok(())
    }
}

/// Audio and subtitle delays after combining auto-sync with manual values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectiveDelays {
    pub audio_ms: i32,
    pub subtitle_ms: i32,
    /// An auto-detected offset contributed to the delays.
    pub auto_applied: bool,
}

impl EffectiveDelays {
    /// Add the detected offset to the manual delays.
    ///
    /// Without an offset the manual delays are used unchanged.
    pub fn resolve(auto_offset_ms: Option<i32>, manual_audio_ms: i32, manual_subtitle_ms: i32) -> Self {
        match auto_offset_ms {
            Some(offset) => Self {
                audio_ms: offset.saturating_add(manual_audio_ms),
                subtitle_ms: offset.saturating_add(manual_subtitle_ms),
                auto_applied: true,
            },
            None => Self {
                audio_ms: manual_audio_ms,
                subtitle_ms: manual_subtitle_ms,
                auto_applied: false,
            },
        }
    }

    /// Resolve using the manual delays from settings.
    pub fn from_settings(auto_offset_ms: Option<i32>, settings: &SyncSettings) -> Self {
        Self::resolve(auto_offset_ms, settings.audio_delay_ms, settings.subtitle_delay_ms)
    }
}

/// Error types for offset estimation.
///
/// Every variant means "no offset"; callers fall back to manual delays.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A pipeline produced no output.
    #[error("Could not analyze {stream} audio: extraction produced no output")]
    ExtractionFailed { stream: StreamRole },

    /// Too few markers for a reliable search.
    #[error(
        "Insufficient audio markers: {reference} reference, {candidate} candidate ({required} required)"
    )]
    InsufficientMarkers {
        reference: usize,
        candidate: usize,
        required: usize,
    },
}

/// Type alias for sync results.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_set_concatenates_kinds() {
        let set = MarkerSet::from_parts(vec![1.0, 5.0], vec![2.0], vec![2.0, 9.5]);
        assert_eq!(set.len(), 5);
        assert_eq!(set.times(), &[1.0, 5.0, 2.0, 2.0, 9.5]);
        assert_eq!(set.counts().transients, 2);
        assert_eq!(set.counts().total(), 5);
    }

    #[test]
    fn low_confidence_below_three_coarse_matches() {
        let mut result = SearchResult {
            coarse: PhaseResult { offset_ms: 0, score: 2 },
            fine: PhaseResult { offset_ms: 0, score: 0.1 },
            ultra_fine: PhaseResult { offset_ms: 3, score: 0.1 },
        };
        assert!(result.is_low_confidence());
        result.coarse.score = 3;
        assert!(!result.is_low_confidence());
        assert_eq!(result.offset_ms(), 3);
    }

    #[test]
    fn search_result_display_lists_phases() {
        let result = SearchResult {
            coarse: PhaseResult { offset_ms: 1000, score: 12 },
            fine: PhaseResult { offset_ms: 1230, score: 2.345 },
            ultra_fine: PhaseResult { offset_ms: 1234, score: 1.5 },
        };
        let text = result.to_string();
        assert!(text.contains("coarse 1000ms (12 matches)"));
        assert!(text.contains("ultra-fine 1234ms (score 1.50)"));
    }

    #[test]
    fn effective_delays_add_manual_values() {
        let delays = EffectiveDelays::resolve(Some(-250), 100, 40);
        assert_eq!(delays.audio_ms, -150);
        assert_eq!(delays.subtitle_ms, -210);
        assert!(delays.auto_applied);
    }

    #[test]
    fn effective_delays_fall_back_to_manual() {
        let settings = SyncSettings {
            audio_delay_ms: 80,
            ..SyncSettings::default()
        };
        let delays = EffectiveDelays::from_settings(None, &settings);
        assert_eq!(delays.audio_ms, 80);
        assert_eq!(delays.subtitle_ms, 0);
        assert!(!delays.auto_applied);
    }

    #[test]
    fn track_selector_display() {
        assert_eq!(TrackSelector::Explicit(2).to_string(), "track 2");
        assert_eq!(TrackSelector::BestAvailable.to_string(), "default audio");
    }
}
