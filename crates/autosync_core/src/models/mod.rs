//! Data models shared by the sync core.
//!
//! - Track types
//! - Media tracks and their stream properties
//! - Language matching used to pick the reference track

mod enums;
mod media;

pub use enums::TrackType;
pub use media::{is_language_in_list, StreamProps, Track};
