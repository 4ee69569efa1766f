//! End-to-end offset estimation.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::models::Track;
use crate::tools::ToolPaths;

use super::coordinator::{run_dual_pipelines, PipelineRequest};
use super::markers::{ensure_sufficient, parse_markers};
use super::reference::select_reference_track;
use super::search::find_best_offset;
use super::types::{
    MarkerSet, OffsetEstimate, SearchResult, StageTimings, SyncError, SyncResult, TrackSelector,
    DEFAULT_ANALYSIS_WINDOW_SECS,
};

/// Estimates the offset between a source video's audio and a language file.
#[derive(Debug, Clone)]
pub struct OffsetEstimator {
    ffmpeg: PathBuf,
}

impl OffsetEstimator {
    /// Create an estimator that runs the given ffmpeg executable.
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Create an estimator from resolved tool paths.
    pub fn from_tool_paths(tools: &ToolPaths) -> Self {
        Self::new(tools.ffmpeg.clone())
    }

    /// The ffmpeg executable used for both pipelines.
    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Estimate the offset (ms) to add to `candidate` to align it with `source`.
    ///
    /// The reference is the first source audio track not in `target_languages`
    /// (see [`select_reference_track`]). Both files are analyzed concurrently
    /// over the first `analysis_window_secs` seconds; zero means the default
    /// window.
    pub fn estimate_offset<F>(
        &self,
        source: &Path,
        candidate: &Path,
        source_tracks: &[Track],
        target_languages: &[String],
        is_language_in_list: F,
        analysis_window_secs: u32,
    ) -> SyncResult<OffsetEstimate>
    where
        F: Fn(&Track, &[String]) -> bool,
    {
        let window_secs = effective_window(analysis_window_secs);
        let selection = select_reference_track(source_tracks, target_languages, is_language_in_list);

        tracing::info!(
            "Estimating offset of {} against {} ({}, first {}s)",
            candidate.display(),
            source.display(),
            selection.track,
            window_secs
        );

        let extraction_start = Instant::now();
        let outputs = run_dual_pipelines(
            &self.ffmpeg,
            PipelineRequest::new(source, selection.track),
            PipelineRequest::new(candidate, TrackSelector::BestAvailable),
            window_secs,
        );
        let extraction = extraction_start.elapsed();

        let (reference_text, candidate_text) = outputs.into_texts().map_err(aborted)?;

        let search_start = Instant::now();
        let reference_markers = parse_markers(&reference_text);
        let candidate_markers = parse_markers(&candidate_text);
        tracing::debug!("Reference markers: {}", reference_markers.counts());
        tracing::debug!("Candidate markers: {}", candidate_markers.counts());

        let search =
            estimate_from_markers(&reference_markers, &candidate_markers).map_err(aborted)?;
        let timings = StageTimings {
            extraction,
            search: search_start.elapsed(),
        };

        let estimate = OffsetEstimate {
            offset_ms: search.offset_ms(),
            search,
            reference_track: selection.track,
            reference_track_targeted: selection.all_tracks_targeted,
            reference_markers: reference_markers.counts(),
            candidate_markers: candidate_markers.counts(),
            timings,
        };

        tracing::info!(
            "Detected offset {} (extraction {:.1}s, search {:.1}s)",
            estimate,
            timings.extraction.as_secs_f64(),
            timings.search.as_secs_f64()
        );
        Ok(estimate)
    }

    /// Like [`estimate_offset`](Self::estimate_offset), reduced to the
    /// offset alone. Any failure gives `None`.
    pub fn estimate_offset_ms<F>(
        &self,
        source: &Path,
        candidate: &Path,
        source_tracks: &[Track],
        target_languages: &[String],
        is_language_in_list: F,
        analysis_window_secs: u32,
    ) -> Option<i32>
    where
        F: Fn(&Track, &[String]) -> bool,
    {
        self.estimate_offset(
            source,
            candidate,
            source_tracks,
            target_languages,
            is_language_in_list,
            analysis_window_secs,
        )
        .ok()
        .map(|estimate| estimate.offset_ms)
    }
}

fn aborted(e: SyncError) -> SyncError {
    tracing::warn!("Auto-sync aborted: {}", e);
    e
}

fn effective_window(analysis_window_secs: u32) -> u32 {
    if analysis_window_secs == 0 {
        DEFAULT_ANALYSIS_WINDOW_SECS
    } else {
        analysis_window_secs
    }
}

/// Run the three-phase search once both marker sets are large enough.
pub fn estimate_from_markers(reference: &MarkerSet, candidate: &MarkerSet) -> SyncResult<SearchResult> {
    ensure_sufficient(reference, candidate)?;

    let result = find_best_offset(reference.times(), candidate.times());
    tracing::info!("Offset search: {}", result);
    if result.is_low_confidence() {
        tracing::warn!(
            "Only {} coarse matches at {}ms, offset may be unreliable",
            result.coarse.score,
            result.coarse.offset_ms
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::types::StreamRole;

    const REFERENCE: [f64; 10] = [
        65.0, 71.4, 83.9, 97.25, 104.6, 118.05, 131.7, 149.3, 162.85, 180.1,
    ];

    #[test]
    fn zero_window_uses_default() {
        assert_eq!(effective_window(0), DEFAULT_ANALYSIS_WINDOW_SECS);
        assert_eq!(effective_window(120), 120);
    }

    #[test]
    fn markers_below_minimum_abort() {
        let reference = MarkerSet::from_times(REFERENCE.to_vec());
        let candidate = MarkerSet::from_times(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            estimate_from_markers(&reference, &candidate),
            Err(SyncError::InsufficientMarkers { candidate: 4, .. })
        ));
    }

    #[test]
    fn search_from_markers_recovers_shift() {
        let reference = MarkerSet::from_times(REFERENCE.to_vec());
        let candidate = MarkerSet::from_times(REFERENCE.iter().map(|t| t + 2.5).collect());
        let result = estimate_from_markers(&reference, &candidate).unwrap();
        assert_eq!(result.offset_ms(), -2500);
    }

    #[test]
    fn uses_resolved_ffmpeg() {
        let tools = ToolPaths {
            ffmpeg: PathBuf::from("/opt/tools/ffmpeg"),
            mkvmerge: PathBuf::from("/opt/tools/mkvmerge"),
        };
        let estimator = OffsetEstimator::from_tool_paths(&tools);
        assert_eq!(estimator.ffmpeg(), Path::new("/opt/tools/ffmpeg"));
    }

    #[test]
    fn missing_ffmpeg_yields_no_offset() {
        let estimator = OffsetEstimator::new("/nonexistent/ffmpeg");
        let offset = estimator.estimate_offset_ms(
            Path::new("source.mkv"),
            Path::new("lang.mkv"),
            &[],
            &[],
            crate::models::is_language_in_list,
            10,
        );
        assert_eq!(offset, None);
    }

    #[cfg(unix)]
    mod fake_ffmpeg {
        use super::*;
        use crate::models::is_language_in_list;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Silence lines for `times`, alternating start and end.
        fn silence_lines(times: impl Iterator<Item = f64>) -> String {
            times
                .enumerate()
                .map(|(i, t)| {
                    let kind = if i % 2 == 0 { "silence_start" } else { "silence_end" };
                    format!("[silencedetect @ 0x55d0] {}: {}\n", kind, t)
                })
                .collect()
        }

        /// Write a shell script standing in for ffmpeg.
        ///
        /// The producer echoes its arguments (also appended to `calls.log`).
        /// The consumer reads them back and prints the reference fixture to
        /// stderr when they name `reference.mkv`, the candidate fixture
        /// otherwise. Missing fixtures print nothing.
        fn setup(reference: Option<&str>, candidate: Option<&str>) -> (TempDir, PathBuf) {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            if let Some(text) = reference {
                fs::write(root.join("reference.txt"), text).unwrap();
            }
            if let Some(text) = candidate {
                fs::write(root.join("candidate.txt"), text).unwrap();
            }

            let script = format!(
                r#"#!/bin/sh
case "$*" in
  *"-f null"*)
    input=$(cat)
    case "$input" in
      *reference.mkv*) cat "{root}/reference.txt" >&2 2>/dev/null ;;
      *) cat "{root}/candidate.txt" >&2 2>/dev/null ;;
    esac
    ;;
  *)
    echo "$@" >> "{root}/calls.log"
    echo "$@"
    ;;
esac
exit 0
"#,
                root = root.display()
            );
            let ffmpeg = root.join("ffmpeg");
            fs::write(&ffmpeg, script).unwrap();
            fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();
            (dir, ffmpeg)
        }

        fn tracks() -> Vec<Track> {
            vec![Track::audio(0, "ita"), Track::audio(1, "eng")]
        }

        #[test]
        fn estimates_shift_between_two_files() {
            crate::logging::init_test_tracing();
            let reference = silence_lines(REFERENCE.iter().copied());
            let candidate = silence_lines(REFERENCE.iter().map(|t| t - 1.234));
            let (dir, ffmpeg) = setup(Some(&reference), Some(&candidate));

            let estimate = OffsetEstimator::new(ffmpeg)
                .estimate_offset(
                    &dir.path().join("reference.mkv"),
                    &dir.path().join("candidate.mkv"),
                    &tracks(),
                    &["ita".to_string()],
                    is_language_in_list,
                    0,
                )
                .unwrap();

            assert_eq!(estimate.offset_ms, 1234);
            assert_eq!(estimate.reference_track, TrackSelector::Explicit(1));
            assert!(!estimate.is_low_confidence());
            assert_eq!(estimate.reference_markers.silence_starts, 5);
            assert_eq!(estimate.candidate_markers.total(), 10);

            let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
            assert!(calls.contains("-map 0:1"));
            assert!(calls.contains("-vn"));
            assert!(calls.contains("-t 300"));
        }

        #[test]
        fn candidate_without_output_fails_extraction() {
            let reference = silence_lines(REFERENCE.iter().copied());
            let (dir, ffmpeg) = setup(Some(&reference), None);

            let result = OffsetEstimator::new(ffmpeg).estimate_offset(
                &dir.path().join("reference.mkv"),
                &dir.path().join("candidate.mkv"),
                &tracks(),
                &["ita".to_string()],
                is_language_in_list,
                60,
            );
            assert!(matches!(
                result,
                Err(SyncError::ExtractionFailed {
                    stream: StreamRole::Candidate
                })
            ));
        }

        #[test]
        fn sparse_markers_give_no_offset() {
            let reference = silence_lines(REFERENCE.iter().copied());
            let candidate = silence_lines([3.0, 4.0].into_iter());
            let (dir, ffmpeg) = setup(Some(&reference), Some(&candidate));
            let estimator = OffsetEstimator::new(ffmpeg);

            let result = estimator.estimate_offset(
                &dir.path().join("reference.mkv"),
                &dir.path().join("candidate.mkv"),
                &tracks(),
                &[],
                is_language_in_list,
                60,
            );
            assert!(matches!(
                result,
                Err(SyncError::InsufficientMarkers {
                    reference: 10,
                    candidate: 2,
                    required: 5
                })
            ));
            assert_eq!(
                estimator.estimate_offset_ms(
                    &dir.path().join("reference.mkv"),
                    &dir.path().join("candidate.mkv"),
                    &tracks(),
                    &[],
                    is_language_in_list,
                    60,
                ),
                None
            );
        }
    }
}
