//! Lyrics parsing and lookup
//!
//! This module provides:
//! - A two-pass LRC parser (syntax tokens, then timed lines)
//! - Data structures for line and word highlighting
//! - Lookup of stored and sidecar lyrics with in-memory caching

mod bidi;
pub mod helper;
pub mod legacy;
pub mod local;
pub mod model;
pub mod semantic;
mod token;

pub use helper::{LyricsHelper, SongRef};
pub use legacy::convert_for_legacy;
pub use model::SemanticLyrics;
