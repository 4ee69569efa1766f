//! Autosync Core - audio offset estimation for dubbed language tracks
//!
//! This crate aligns an independently produced audio track (a dub or an
//! alternate-language release) against the reference audio of a source video.
//! It has no UI dependencies and is driven by the file-processing tool that
//! merges the tracks.

pub mod config;
pub mod logging;
pub mod models;
pub mod sync;
pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
