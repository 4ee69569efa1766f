//! Executable lookup.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::PathSettings;

use super::{ToolError, ToolResult};

/// Resolved locations of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub mkvmerge: PathBuf,
}

impl ToolPaths {
    /// Resolve both tools from path settings.
    pub fn from_settings(paths: &PathSettings) -> ToolResult<Self> {
        let folder = Path::new(&paths.tools_folder);
        Ok(Self {
            ffmpeg: resolve_executable("ffmpeg", configured(&paths.ffmpeg_path), folder)?,
            mkvmerge: resolve_executable("mkvmerge", configured(&paths.mkvmerge_path), folder)?,
        })
    }
}

fn configured(path: &str) -> Option<&Path> {
    let trimmed = path.trim();
    (!trimmed.is_empty()).then(|| Path::new(trimmed))
}

/// Locate an executable by name.
///
/// Order: the explicitly configured path (must exist), `tools_folder/<name>`,
/// then every directory on `PATH`. The platform executable suffix is added.
pub fn resolve_executable(
    name: &str,
    configured_path: Option<&Path>,
    tools_folder: &Path,
) -> ToolResult<PathBuf> {
    if let Some(path) = configured_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ToolError::ConfiguredPathMissing {
            tool: name.to_string(),
            path: path.display().to_string(),
        });
    }

    let file_name = format!("{}{}", name, env::consts::EXE_SUFFIX);

    let in_tools = tools_folder.join(&file_name);
    if in_tools.is_file() {
        tracing::debug!("Using {} from tools folder: {}", name, in_tools.display());
        return Ok(in_tools);
    }

    if let Some(path_var) = env::var_os("PATH") {
        for dir in env::split_paths(&path_var) {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                tracing::debug!("Using {} from PATH: {}", name, candidate.display());
                return Ok(candidate);
            }
        }
    }

    Err(ToolError::NotFound {
        tool: name.to_string(),
    })
}
