//! Reference track selection.
//!
//! Aligning two tracks in the language being imported would compare the same
//! dialogue twice; music, effects and pauses from a different-language track
//! make better anchors. So the reference avoids the target languages when the
//! source offers an alternative.

use crate::models::Track;

use super::types::TrackSelector;

/// Result of reference track selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSelection {
    /// Source stream to use as the reference.
    pub track: TrackSelector,
    /// Every audio track is in a target language; sync may be unreliable.
    pub all_tracks_targeted: bool,
}

/// Pick the source audio track used as the sync reference.
///
/// Non-audio tracks are ignored. The first audio track is used implicitly
/// unless its language is a target language, in which case the first
/// non-target audio track is selected by id.
pub fn select_reference_track<F>(
    tracks: &[Track],
    target_languages: &[String],
    is_language_in_list: F,
) -> ReferenceSelection
where
    F: Fn(&Track, &[String]) -> bool,
{
    let default_selection = ReferenceSelection {
        track: TrackSelector::BestAvailable,
        all_tracks_targeted: false,
    };

    let mut audio_tracks = tracks.iter().filter(|t| t.is_audio()).peekable();

    let default_is_target = match audio_tracks.peek() {
        Some(first) => is_language_in_list(*first, target_languages),
        None => return default_selection,
    };
    if !default_is_target {
        return default_selection;
    }

    match audio_tracks.find(|t| !is_language_in_list(*t, target_languages)) {
        Some(track) => {
            tracing::info!(
                "Default audio is in {}, using {} as sync reference",
                target_languages.join(","),
                track.display_name()
            );
            ReferenceSelection {
                track: TrackSelector::Explicit(track.id),
                all_tracks_targeted: false,
            }
        }
        None => {
            tracing::warn!(
                "All audio tracks are in {}, sync may not be reliable",
                target_languages.join(",")
            );
            ReferenceSelection {
                track: TrackSelector::BestAvailable,
                all_tracks_targeted: true,
            }
        }
    }
}
