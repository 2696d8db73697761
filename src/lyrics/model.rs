//! Structured lyric representation produced by the LRC parser.

use serde::Serialize;
use std::ops::{Range, RangeInclusive};

/// Who is singing a line.
///
/// Walaoke speakers (`Male`, `Female`, `Duet`) stick to following lines until
/// another speaker is named. iTunes speakers only apply to the line they appear on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpeakerEntity {
    Male,
    Female,
    Duet,
    Background,
    Voice1,
    Voice2,
    Voice2Background,
}

impl SpeakerEntity {
    pub fn is_walaoke(self) -> bool {
        matches!(self, Self::Male | Self::Female | Self::Duet)
    }

    pub fn is_voice2(self) -> bool {
        matches!(self, Self::Voice2 | Self::Voice2Background)
    }

    pub fn is_background(self) -> bool {
        matches!(self, Self::Background | Self::Voice2Background)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Duet => "D",
            Self::Background => "bg",
            Self::Voice1 => "v1",
            Self::Voice2 => "v2",
            Self::Voice2Background => "v2/bg",
        }
    }
}

/// A timed span of a line's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Word {
    /// Milliseconds, both ends inclusive.
    pub time_range: RangeInclusive<u64>,
    /// Char offsets into [`LyricLine::text`].
    pub char_range: Range<usize>,
    pub is_rtl: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricLine {
    pub text: String,
    /// Start in milliseconds.
    pub start: u64,
    pub words: Option<Vec<Word>>,
    pub speaker: Option<SpeakerEntity>,
}

impl LyricLine {
    /// Index of the word being sung at `position_ms`.
    pub fn current_word(&self, position_ms: u64) -> Option<usize> {
        self.words
            .as_ref()?
            .iter()
            .position(|w| w.time_range.contains(&position_ms))
    }

    /// Text covered by a word of this line.
    pub fn word_text(&self, word: &Word) -> String {
        self.text
            .chars()
            .skip(word.char_range.start)
            .take(word.char_range.len())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricLineHolder {
    pub lyric: LyricLine,
    /// Set when the line starts at the same instant as the line before it.
    pub is_translated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "lines", rename_all = "snake_case")]
pub enum SemanticLyrics {
    Unsynced(Vec<String>),
    Synced(Vec<LyricLineHolder>),
}

impl SemanticLyrics {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    pub fn unsynced_text(&self) -> Vec<String> {
        match self {
            Self::Unsynced(lines) => lines.clone(),
            Self::Synced(lines) => lines.iter().map(|l| l.lyric.text.clone()).collect(),
        }
    }

    /// Timed lines, empty for unsynced lyrics.
    pub fn synced_lines(&self) -> &[LyricLineHolder] {
        match self {
            Self::Synced(lines) => lines,
            Self::Unsynced(_) => &[],
        }
    }

    /// Index of the last line that started at or before `position_ms`.
    pub fn current_line(&self, position_ms: u64) -> Option<usize> {
        self.synced_lines()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.lyric.start <= position_ms)
            .map(|(i, _)| i)
            .next_back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, start: u64) -> LyricLineHolder {
        LyricLineHolder {
            lyric: LyricLine {
                text: text.to_string(),
                start,
                words: None,
                speaker: None,
            },
            is_translated: false,
        }
    }

    #[test]
    fn test_speaker_facets() {
        assert!(SpeakerEntity::Male.is_walaoke());
        assert!(SpeakerEntity::Duet.is_walaoke());
        assert!(!SpeakerEntity::Voice1.is_walaoke());
        assert!(SpeakerEntity::Voice2Background.is_voice2());
        assert!(SpeakerEntity::Voice2Background.is_background());
        assert!(SpeakerEntity::Background.is_background());
        assert!(!SpeakerEntity::Background.is_voice2());
    }

    #[test]
    fn test_current_line() {
        let lyrics = SemanticLyrics::Synced(vec![line("a", 1000), line("b", 2000), line("c", 3000)]);
        assert_eq!(lyrics.current_line(500), None);
        assert_eq!(lyrics.current_line(1000), Some(0));
        assert_eq!(lyrics.current_line(2999), Some(1));
        assert_eq!(lyrics.current_line(60_000), Some(2));

        let plain = SemanticLyrics::Unsynced(vec!["a".into()]);
        assert_eq!(plain.current_line(10_000), None);
    }

    #[test]
    fn test_current_word() {
        let l = LyricLine {
            text: "Hi there".to_string(),
            start: 0,
            words: Some(vec![
                Word { time_range: 0..=499, char_range: 0..3, is_rtl: false },
                Word { time_range: 500..=900, char_range: 3..8, is_rtl: false },
            ]),
            speaker: None,
        };
        assert_eq!(l.current_word(200), Some(0));
        assert_eq!(l.current_word(500), Some(1));
        assert_eq!(l.current_word(901), None);
        let words = l.words.as_ref().unwrap();
        assert_eq!(l.word_text(&words[1]), "there");
    }

    #[test]
    fn test_unsynced_text_of_synced() {
        let lyrics = SemanticLyrics::Synced(vec![line("a", 1), line("b", 2)]);
        assert_eq!(lyrics.unsynced_text(), vec!["a".to_string(), "b".to_string()]);
        assert!(lyrics.is_synced());
    }
}
