//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::sync::DEFAULT_ANALYSIS_WINDOW_SECS;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// External tool locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Auto-sync settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Path configuration for external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder searched first for ffmpeg and mkvmerge.
    #[serde(default = "default_tools_folder")]
    pub tools_folder: String,

    /// Explicit ffmpeg path; overrides the folder/PATH lookup when set.
    #[serde(default)]
    pub ffmpeg_path: String,

    /// Explicit mkvmerge path; overrides the folder/PATH lookup when set.
    #[serde(default)]
    pub mkvmerge_path: String,
}

fn default_tools_folder() -> String {
    "tools".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            tools_folder: default_tools_folder(),
            ffmpeg_path: String::new(),
            mkvmerge_path: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when RUST_LOG is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Folder for the log file; empty disables file logging.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Auto-sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Run offset estimation for each imported file.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds of audio analyzed from the start of each file.
    #[serde(default = "default_analysis_window")]
    pub analysis_window_secs: u32,

    /// Manual audio delay in ms, added on top of the detected offset.
    #[serde(default)]
    pub audio_delay_ms: i32,

    /// Manual subtitle delay in ms, added on top of the detected offset.
    #[serde(default)]
    pub subtitle_delay_ms: i32,
}

fn default_analysis_window() -> u32 {
    DEFAULT_ANALYSIS_WINDOW_SECS
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            analysis_window_secs: default_analysis_window(),
            audio_delay_ms: 0,
            subtitle_delay_ms: 0,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Sync,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 3] =
        [ConfigSection::Paths, ConfigSection::Logging, ConfigSection::Sync];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Sync => "sync",
        }
    }

    /// Comment written above the section in generated files.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "External tool locations",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Sync => "Audio auto-sync settings",
        }
    }
}
