//! Core enums used throughout the crate.

use serde::{Deserialize, Serialize};

/// Type of media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitles,
}

impl TrackType {
    /// Parse the track type string reported by mkvmerge.
    ///
    /// Matching is case-insensitive; unknown types (buttons, etc.) return `None`.
    pub fn from_mkvmerge(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "video" => Some(TrackType::Video),
            "audio" => Some(TrackType::Audio),
            "subtitles" => Some(TrackType::Subtitles),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
            TrackType::Subtitles => write!(f, "subtitles"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mkvmerge_ignores_case() {
        assert_eq!(TrackType::from_mkvmerge("Audio"), Some(TrackType::Audio));
        assert_eq!(TrackType::from_mkvmerge("subtitles"), Some(TrackType::Subtitles));
        assert_eq!(TrackType::from_mkvmerge("buttons"), None);
    }

    #[test]
    fn track_type_serializes_lowercase() {
        let json = serde_json::to_string(&TrackType::Video).unwrap();
        assert_eq!(json, "\"video\"");
    }
}
