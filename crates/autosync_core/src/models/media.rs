//! Media track structures and language matching.

use serde::{Deserialize, Serialize};

use super::enums::TrackType;

/// Properties of a media stream (codec, language, name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProps {
    /// Codec identifier (e.g., "A_AAC", "A_EAC3").
    #[serde(default)]
    pub codec_id: String,
    /// Language code (ISO 639-2, e.g., "eng", "ita", "und").
    #[serde(default = "default_lang")]
    pub lang: String,
    /// IETF BCP 47 language tag (e.g., "it-IT"), empty when not set.
    #[serde(default)]
    pub lang_ietf: String,
    /// Track name/title.
    #[serde(default)]
    pub name: String,
}

fn default_lang() -> String {
    "und".to_string()
}

impl StreamProps {
    /// Create new stream properties with required codec.
    pub fn new(codec_id: impl Into<String>) -> Self {
        Self {
            codec_id: codec_id.into(),
            lang: default_lang(),
            lang_ietf: String::new(),
            name: String::new(),
        }
    }

    /// Set the language code.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Set the IETF language tag.
    pub fn with_lang_ietf(mut self, lang_ietf: impl Into<String>) -> Self {
        self.lang_ietf = lang_ietf.into();
        self
    }

    /// Set the track name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A single track within a media container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track ID within the container (mkvmerge numbering).
    pub id: u32,
    /// Type of track (video, audio, subtitles).
    #[serde(rename = "type")]
    pub track_type: TrackType,
    /// Stream properties.
    pub props: StreamProps,
}

impl Track {
    /// Create a new track.
    pub fn new(id: u32, track_type: TrackType, props: StreamProps) -> Self {
        Self {
            id,
            track_type,
            props,
        }
    }

    /// Shorthand for an audio track with the given language.
    pub fn audio(id: u32, lang: impl Into<String>) -> Self {
        Self::new(id, TrackType::Audio, StreamProps::new("").with_lang(lang))
    }

    /// Whether this is an audio track.
    pub fn is_audio(&self) -> bool {
        self.track_type == TrackType::Audio
    }

    /// Get a display string for this track.
    pub fn display_name(&self) -> String {
        let name_part = if self.props.name.is_empty() {
            String::new()
        } else {
            format!(" - {}", self.props.name)
        };
        format!(
            "{} Track {} ({}){}",
            self.track_type, self.id, self.props.lang, name_part
        )
    }

    /// Check whether the track matches a language code.
    ///
    /// The ISO 639-2 code must match exactly; otherwise the IETF tag may
    /// match exactly or start with the given code. Case-insensitive.
    pub fn matches_language(&self, language: &str) -> bool {
        let language = language.trim();
        if language.is_empty() {
            return false;
        }

        if self.props.lang.eq_ignore_ascii_case(language) {
            return true;
        }

        let ietf = self.props.lang_ietf.to_ascii_lowercase();
        !ietf.is_empty() && ietf.starts_with(&language.to_ascii_lowercase())
    }

    /// Check whether the track matches any of the given language codes.
    pub fn matches_any_language(&self, languages: &[String]) -> bool {
        languages.iter().any(|lang| self.matches_language(lang))
    }
}

/// Default language-membership predicate for reference track selection.
pub fn is_language_in_list(track: &Track, languages: &[String]) -> bool {
    track.matches_any_language(languages)
}
