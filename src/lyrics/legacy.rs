//! Flat line list for renderers that only understand timestamp + text.

use super::model::SemanticLyrics;
use serde::Serialize;

/// `time` is -1 for lyrics without timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricsEntry {
    pub time: i64,
    pub text: String,
    pub is_translated: bool,
}

pub fn convert_for_legacy(lyrics: Option<&SemanticLyrics>) -> Vec<LyricsEntry> {
    match lyrics {
        None => Vec::new(),
        Some(SemanticLyrics::Synced(lines)) => lines
            .iter()
            .map(|l| LyricsEntry {
                time: l.lyric.start as i64,
                text: l.lyric.text.clone(),
                is_translated: l.is_translated,
            })
            .collect(),
        Some(unsynced) => vec![LyricsEntry {
            time: -1,
            text: unsynced.unsynced_text().join("\n"),
            is_translated: false,
        }],
    }
}
