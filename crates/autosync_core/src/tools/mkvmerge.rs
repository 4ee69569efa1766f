//! Track listing via `mkvmerge -J`.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::models::{StreamProps, Track, TrackType};

use super::{ToolError, ToolResult};

/// Result of mkvmerge -J command.
#[derive(Debug, Deserialize)]
struct MkvmergeInfo {
    #[serde(default)]
    tracks: Vec<MkvmergeTrack>,
}

#[derive(Debug, Deserialize)]
struct MkvmergeTrack {
    id: u32,
    #[serde(rename = "type")]
    track_type: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: MkvmergeTrackProps,
}

#[derive(Debug, Default, Deserialize)]
struct MkvmergeTrackProps {
    language: Option<String>,
    language_ietf: Option<String>,
    track_name: Option<String>,
    codec_id: Option<String>,
}

/// List every track of a container using mkvmerge.
pub fn list_tracks(mkvmerge: &Path, path: &Path) -> ToolResult<Vec<Track>> {
    if !path.exists() {
        return Err(ToolError::SourceNotFound(path.display().to_string()));
    }

    let mut cmd = Command::new(mkvmerge);
    cmd.arg("-J").arg(path).stdin(Stdio::null());

    tracing::debug!("Running mkvmerge: {:?}", cmd);

    let output = cmd.output().map_err(|e| ToolError::Failed {
        tool: "mkvmerge".to_string(),
        message: format!("failed to run: {}", e),
    })?;

    if !output.status.success() {
        // mkvmerge reports identification errors on stdout as JSON
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        return Err(ToolError::Failed {
            tool: "mkvmerge".to_string(),
            message: format!("{}{}", stderr.trim(), stdout.trim()),
        });
    }

    parse_track_list(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `mkvmerge -J` JSON into tracks.
///
/// Tracks of unknown type are skipped. Missing codec IDs fall back to the
/// codec display name.
pub fn parse_track_list(json: &str) -> ToolResult<Vec<Track>> {
    let info: MkvmergeInfo = serde_json::from_str(json).map_err(|e| ToolError::InvalidOutput {
        tool: "mkvmerge".to_string(),
        message: e.to_string(),
    })?;

    let tracks = info
        .tracks
        .into_iter()
        .filter_map(|t| {
            let track_type = TrackType::from_mkvmerge(&t.track_type)?;
            let codec_id = t.properties.codec_id.unwrap_or(t.codec);
            let mut props = StreamProps::new(codec_id);
            if let Some(lang) = t.properties.language.filter(|l| !l.is_empty()) {
                props = props.with_lang(lang);
            }
            if let Some(ietf) = t.properties.language_ietf {
                props = props.with_lang_ietf(ietf);
            }
            if let Some(name) = t.properties.track_name {
                props = props.with_name(name);
            }
            Some(Track::new(t.id, track_type, props))
        })
        .collect();

    Ok(tracks)
}
