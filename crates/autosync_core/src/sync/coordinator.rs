//! Runs the reference and candidate pipelines side by side.

use std::path::Path;
use std::thread;

use super::pipeline::{extract_analysis_text, PipelineOutput};
use super::types::{StreamRole, SyncError, SyncResult, TrackSelector};

/// One stream to extract.
#[derive(Debug, Clone, Copy)]
pub struct PipelineRequest<'a> {
    /// Media file to decode.
    pub input: &'a Path,
    /// Audio stream to decode from it.
    pub track: TrackSelector,
}

impl<'a> PipelineRequest<'a> {
    pub fn new(input: &'a Path, track: TrackSelector) -> Self {
        Self { input, track }
    }
}

/// Outputs of both pipelines.
#[derive(Debug, Clone, Default)]
pub struct DualOutput {
    pub reference: PipelineOutput,
    pub candidate: PipelineOutput,
}

impl DualOutput {
    /// Take both texts, failing if either pipeline produced nothing.
    pub fn into_texts(self) -> SyncResult<(String, String)> {
        for (role, output) in [
            (StreamRole::Reference, &self.reference),
            (StreamRole::Candidate, &self.candidate),
        ] {
            if let Some(error) = &output.process_error {
                tracing::warn!("{} pipeline error: {}", role, error);
            }
            if output.is_empty() {
                return Err(SyncError::ExtractionFailed { stream: role });
            }
        }
        Ok((self.reference.text, self.candidate.text))
    }
}

/// Run both ffmpeg pipelines concurrently with the same analysis window.
pub fn run_dual_pipelines(
    ffmpeg: &Path,
    reference: PipelineRequest<'_>,
    candidate: PipelineRequest<'_>,
    window_secs: u32,
) -> DualOutput {
    run_dual_with(reference, candidate, |request| {
        extract_analysis_text(ffmpeg, request.input, request.track, window_secs)
    })
}

/// Run `run` for both requests on separate OS threads and join both.
///
/// A panicking pipeline thread yields an empty output.
pub fn run_dual_with<F>(
    reference: PipelineRequest<'_>,
    candidate: PipelineRequest<'_>,
    run: F,
) -> DualOutput
where
    F: Fn(&PipelineRequest<'_>) -> PipelineOutput + Sync,
{
    let run = &run;
    thread::scope(|s| {
        let reference_handle = s.spawn(move || run(&reference));
        let candidate_handle = s.spawn(move || run(&candidate));

        DualOutput {
            reference: reference_handle
                .join()
                .unwrap_or_else(|_| panicked(StreamRole::Reference)),
            candidate: candidate_handle
                .join()
                .unwrap_or_else(|_| panicked(StreamRole::Candidate)),
        }
    })
}

fn panicked(role: StreamRole) -> PipelineOutput {
    tracing::error!("{} pipeline thread panicked", role);
    PipelineOutput {
        text: String::new(),
        process_error: Some(format!("{} pipeline thread panicked", role)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn output(text: &str) -> PipelineOutput {
        PipelineOutput {
            text: text.to_string(),
            process_error: None,
        }
    }

    #[test]
    fn runs_both_requests_concurrently() {
        // Both threads must reach the barrier, which only happens if they overlap.
        let barrier = Barrier::new(2);
        let result = run_dual_with(
            PipelineRequest::new(Path::new("source.mkv"), TrackSelector::Explicit(1)),
            PipelineRequest::new(Path::new("lang.mkv"), TrackSelector::BestAvailable),
            |request| {
                barrier.wait();
                output(&format!("{} {}", request.input.display(), request.track))
            },
        );
        assert_eq!(result.reference.text, "source.mkv track 1");
        assert_eq!(result.candidate.text, "lang.mkv default audio");
    }

    #[test]
    fn panicking_pipeline_becomes_empty_output() {
        let result = run_dual_with(
            PipelineRequest::new(Path::new("source.mkv"), TrackSelector::BestAvailable),
            PipelineRequest::new(Path::new("lang.mkv"), TrackSelector::BestAvailable),
            |request| {
                if request.input == Path::new("lang.mkv") {
                    panic!("boom");
                }
                output("ok")
            },
        );
        assert_eq!(result.reference.text, "ok");
        assert!(result.candidate.is_empty());
        assert!(matches!(
            result.into_texts(),
            Err(SyncError::ExtractionFailed {
                stream: StreamRole::Candidate
            })
        ));
    }

    #[test]
    fn empty_reference_fails_first() {
        let dual = DualOutput {
            reference: output(""),
            candidate: output(""),
        };
        assert!(matches!(
            dual.into_texts(),
            Err(SyncError::ExtractionFailed {
                stream: StreamRole::Reference
            })
        ));
    }

    #[test]
    fn non_empty_outputs_are_returned_in_order() {
        let dual = DualOutput {
            reference: output("ref"),
            candidate: output("cand"),
        };
        let (reference, candidate) = dual.into_texts().unwrap();
        assert_eq!(reference, "ref");
        assert_eq!(candidate, "cand");
    }
}
