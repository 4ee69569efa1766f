//! External tool discovery and track listing.
//!
//! The sync core shells out to ffmpeg for extraction/analysis and reads
//! container track lists from mkvmerge. Both are located through the same
//! lookup: explicit path, then the tools folder, then `PATH`.

mod mkvmerge;
mod resolve;

pub use mkvmerge::{list_tracks, parse_track_list};
pub use resolve::{resolve_executable, ToolPaths};

use thiserror::Error;

/// Errors from tool resolution and invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Executable was not found anywhere.
    #[error("{tool} not found (checked configured path, tools folder and PATH)")]
    NotFound { tool: String },

    /// Configured path does not exist.
    #[error("Configured {tool} path does not exist: {path}")]
    ConfiguredPathMissing { tool: String, path: String },

    /// Tool ran but failed.
    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },

    /// Tool output could not be parsed.
    #[error("Failed to parse {tool} output: {message}")]
    InvalidOutput { tool: String, message: String },

    /// Input file is missing.
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;
