//! Configuration management.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//!
//! # Example
//!
//! ```no_run
//! use autosync_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/autosync.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Window: {}s", config.settings().sync.analysis_window_secs);
//!
//! config.settings_mut().sync.enabled = true;
//! config.update_section(ConfigSection::Sync).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, LoggingSettings, PathSettings, Settings, SyncSettings};
