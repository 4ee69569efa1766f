//! Audio offset estimation.
//!
//! Finds the delay between the audio of a source video and an independently
//! produced language track by comparing acoustic events:
//!
//! 1. Pick a reference audio track in the source ([`select_reference_track`])
//! 2. Decode and analyze both files concurrently through ffmpeg
//!    ([`run_dual_pipelines`])
//! 3. Parse silence boundaries and loudness transients into markers
//!    ([`parse_markers`])
//! 4. Search offsets coarse-to-fine ([`find_best_offset`])
//!
//! [`OffsetEstimator`] runs all steps.

mod coordinator;
mod estimator;
mod markers;
mod pipeline;
mod reference;
mod search;
mod types;

pub use coordinator::{run_dual_pipelines, run_dual_with, DualOutput, PipelineRequest};
pub use estimator::{estimate_from_markers, OffsetEstimator};
pub use markers::{
    detect_transients, ensure_sufficient, parse_loudness_samples, parse_markers,
    parse_silence_ends, parse_silence_starts, LoudnessSample, LOUDNESS_FLOOR_DB,
    TRANSIENT_THRESHOLD_DB,
};
pub use pipeline::{
    consumer_command, extract_analysis_text, producer_command, run_piped, PipelineOutput,
    ANALYSIS_FILTER_GRAPH, PIPE_BUFFER_SIZE,
};
pub use reference::{select_reference_track, ReferenceSelection};
pub use search::{
    count_matches, find_best_offset, weighted_score, PhaseParams, COARSE_PHASE, FINE_PHASE,
    ULTRA_FINE_PHASE,
};
pub use types::{
    EffectiveDelays, MarkerCounts, MarkerSet, OffsetEstimate, PhaseResult, SearchResult,
    StageTimings, StreamRole, SyncError, SyncResult, TrackSelector, ANALYSIS_SAMPLE_RATE,
    DEFAULT_ANALYSIS_WINDOW_SECS, LOW_CONFIDENCE_MATCHES, MIN_MARKERS,
};
