//! Marker parsing from ffmpeg analysis output.
//!
//! Three kinds of events become markers:
//! - `silence_start: <t>` lines from silencedetect
//! - `silence_end: <t>` lines from silencedetect
//! - loudness transients: the RMS level printed by ametadata rising by more
//!   than [`TRANSIENT_THRESHOLD_DB`] between consecutive frames

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{MarkerSet, SyncError, SyncResult, MIN_MARKERS};

/// Rise in dB between consecutive frames that counts as a transient.
pub const TRANSIENT_THRESHOLD_DB: f64 = 6.0;

/// Levels below this are clamped before comparing, so near-silence
/// (down to -inf) cannot produce huge deltas.
pub const LOUDNESS_FLOOR_DB: f64 = -50.0;

static SILENCE_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"silence_start:\s*([\d.]+)").expect("valid silence_start regex"));

static SILENCE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"silence_end:\s*([\d.]+)").expect("valid silence_end regex"));

static RMS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"pts_time:([\d.]+)\s+lavfi\.astats\.Overall\.RMS_level=(-?(?:inf|[\d.]+))")
        .expect("valid RMS regex")
});

/// One windowed loudness reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    /// Playback time of the window in seconds.
    pub time_secs: f64,
    /// Overall RMS level in dB (may be `-inf` for digital silence).
    pub level_db: f64,
}

/// Timestamps of every `silence_start` event, in text order.
pub fn parse_silence_starts(text: &str) -> Vec<f64> {
    capture_times(&SILENCE_START_RE, text)
}

/// Timestamps of every `silence_end` event, in text order.
pub fn parse_silence_ends(text: &str) -> Vec<f64> {
    capture_times(&SILENCE_END_RE, text)
}

fn capture_times(re: &Regex, text: &str) -> Vec<f64> {
    re.captures_iter(text)
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .collect()
}

/// Loudness samples in the order they appear in the text.
pub fn parse_loudness_samples(text: &str) -> Vec<LoudnessSample> {
    RMS_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let time_secs = caps[1].parse::<f64>().ok()?;
            let level_db = caps[2].parse::<f64>().ok()?;
            Some(LoudnessSample {
                time_secs,
                level_db,
            })
        })
        .collect()
}

/// Times of samples whose clamped level jumps by more than the threshold
/// over the previous sample.
pub fn detect_transients(samples: &[LoudnessSample]) -> Vec<f64> {
    samples
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].level_db.max(LOUDNESS_FLOOR_DB);
            let curr = pair[1].level_db.max(LOUDNESS_FLOOR_DB);
            (curr - prev > TRANSIENT_THRESHOLD_DB).then_some(pair[1].time_secs)
        })
        .collect()
}

/// Parse one pipeline's text into its marker set.
pub fn parse_markers(text: &str) -> MarkerSet {
    let transients = detect_transients(&parse_loudness_samples(text));
    MarkerSet::from_parts(parse_silence_starts(text), parse_silence_ends(text), transients)
}

/// Fail unless both streams have enough markers to search.
pub fn ensure_sufficient(reference: &MarkerSet, candidate: &MarkerSet) -> SyncResult<()> {
    if reference.len() < MIN_MARKERS || candidate.len() < MIN_MARKERS {
        return Err(SyncError::InsufficientMarkers {
            reference: reference.len(),
            candidate: candidate.len(),
            required: MIN_MARKERS,
        });
    }
    Ok(())
}
