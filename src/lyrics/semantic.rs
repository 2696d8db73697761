//! Semantic pass: turns the token stream into timed lines ready for playback.
//!
//! Handles compressed lines, translations (either a whole second file pasted
//! below the first, with its own `[offset:]`, or a translated line directly under
//! the original), extended word timing, speakers and the `[offset:]` header.
//! All other header metadata is ignored.

use super::bidi;
use super::model::{LyricLine, LyricLineHolder, SemanticLyrics, SpeakerEntity, Word};
use super::token::{self, Token};

/// Per-char duration used when a line has no timed word to learn from.
const DEFAULT_MS_PER_CHAR: f64 = 100.0;

fn apply_offset(ts: u64, offset: i64) -> u64 {
    ts.saturating_add_signed(offset)
}

/// Accumulated state of the line being assembled.
#[derive(Default)]
struct LineState {
    /// Start time and text of each segment. Segments without text only mark
    /// where the previous word ends.
    segments: Vec<(u64, Option<String>)>,
    last_sync_point: Option<u64>,
    last_word_sync_point: Option<u64>,
    /// Extra start times of a compressed line.
    compressed: Vec<u64>,
}

impl LineState {
    fn words(&self) -> Option<Vec<Word>> {
        if self.segments.len() <= 1 {
            return None;
        }
        let mut words: Vec<Word> = Vec::new();
        let mut idx = 0;
        for (i, (start, text)) in self.segments.iter().enumerate() {
            let Some(text) = text else {
                continue;
            };
            let start = *start;
            let len = text.chars().count();
            let char_start = idx;
            idx += len;
            let end = if let Some((next, _)) = self.segments.get(i + 1) {
                next.saturating_sub(1)
            } else if let Some(last) = self.last_word_sync_point
                && last > start
            {
                last
            } else {
                // No timestamp after the last word, guess from the pace of this line so far.
                let ratios: Vec<f64> = words
                    .iter()
                    .map(|w| {
                        (w.time_range.end() - w.time_range.start() + 1) as f64
                            / w.char_range.len() as f64
                    })
                    .collect();
                let average = ratios.iter().sum::<f64>() / ratios.len() as f64;
                let ms_per_char = if average.is_finite() {
                    average
                } else {
                    DEFAULT_MS_PER_CHAR
                };
                start + (ms_per_char * len as f64) as u64
            };
            if end > start {
                words.push(Word {
                    time_range: start..=end,
                    char_range: char_start..idx,
                    is_rtl: bidi::is_rtl(text),
                });
            }
        }
        Some(words)
    }

    fn start(&self) -> Option<u64> {
        self.segments
            .first()
            .map(|(ts, _)| *ts)
            .or(self.last_word_sync_point)
            .or(self.last_sync_point)
    }

    /// Builds the finished line plus one copy per compressed timestamp.
    fn finish(&self, speaker: Option<SpeakerEntity>, trim: bool, out: &mut Vec<LyricLine>) {
        let Some(start) = self.start() else {
            return;
        };
        let mut words = self.words();
        let mut text: String = self
            .segments
            .iter()
            .filter_map(|(_, t)| t.as_deref())
            .collect();
        if trim {
            let trimmed_start = text.trim_start();
            let start_diff = text.chars().count() - trimmed_start.chars().count();
            let trimmed = trimmed_start.trim_end().to_string();
            let len = trimmed.chars().count();
            words = words.map(|ws| {
                ws.into_iter()
                    .filter(|w| w.char_range.end > start_diff && w.char_range.start < start_diff + len)
                    .map(|w| Word {
                        char_range: w.char_range.start.saturating_sub(start_diff)
                            ..(w.char_range.end - start_diff).min(len),
                        ..w
                    })
                    .collect()
            });
            text = trimmed;
        }
        let line = LyricLine {
            text,
            start,
            words,
            speaker,
        };
        let copies: Vec<LyricLine> = self
            .compressed
            .iter()
            .map(|&at| {
                let shift = at as i64 - start as i64;
                LyricLine {
                    start: at,
                    words: line.words.as_ref().map(|ws| {
                        ws.iter()
                            .map(|w| Word {
                                time_range: w.time_range.start().saturating_add_signed(shift)
                                    ..=w.time_range.end().saturating_add_signed(shift),
                                ..w.clone()
                            })
                            .collect()
                    }),
                    ..line.clone()
                }
            })
            .collect();
        out.push(line);
        out.extend(copies);
    }
}

fn assemble(tokens: Vec<Token>, trim: bool) -> SemanticLyrics {
    if tokens.iter().all(|t| matches!(t, Token::InvalidText(_))) {
        let lines = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::InvalidText(s) if trim => Some(s.trim().to_string()),
                Token::InvalidText(s) => Some(s),
                _ => None,
            })
            .collect();
        return SemanticLyrics::Unsynced(lines);
    }

    let mut out: Vec<LyricLine> = Vec::new();
    let mut line = LineState::default();
    let mut offset: i64 = 0;
    let mut speaker: Option<SpeakerEntity> = None;
    let mut had_lyric_since_word_sync = true;
    let mut sync_point_streak = 0;
    for token in tokens {
        if matches!(token, Token::SyncPoint(_)) {
            sync_point_streak += 1;
        } else {
            sync_point_streak = 0;
        }
        match token {
            Token::Metadata { name, value } if name == "offset" => {
                // A positive offset plays lyrics earlier.
                match value.trim().parse::<i64>() {
                    Ok(v) => offset = -v,
                    Err(e) => tracing::debug!(value = %value, "ignoring bad offset tag: {e}"),
                }
            }
            Token::SyncPoint(ts) => {
                let ts = apply_offset(ts, offset);
                if sync_point_streak > 1 {
                    line.compressed.push(ts);
                } else {
                    line.compressed.clear();
                    line.last_sync_point = Some(ts);
                }
            }
            Token::SpeakerTag(s) => speaker = Some(s),
            Token::WordSyncPoint(ts) => {
                if !had_lyric_since_word_sync && let Some(prev) = line.last_word_sync_point {
                    line.segments.push((prev, None));
                }
                let ts = apply_offset(ts, offset);
                line.last_word_sync_point = Some(ts);
                if line.last_sync_point.is_none() {
                    line.last_sync_point = Some(ts);
                }
                had_lyric_since_word_sync = false;
            }
            Token::LyricText(text) => {
                had_lyric_since_word_sync = true;
                if let Some(ts) = line.last_word_sync_point.or(line.last_sync_point) {
                    line.segments.push((ts, Some(text)));
                }
            }
            t if t.is_new_line() => {
                line.finish(speaker, trim, &mut out);
                line = LineState::default();
                if !speaker.is_some_and(SpeakerEntity::is_walaoke) {
                    speaker = None;
                }
                had_lyric_since_word_sync = true;
            }
            _ => {}
        }
    }

    out.sort_by_key(|l| l.start);
    let default_male = out.iter().any(|l| l.speaker.is_some_and(SpeakerEntity::is_walaoke))
        && !out.iter().any(|l| l.speaker.is_some_and(|s| !s.is_walaoke()));
    let mut previous_start = None;
    let lines = out
        .into_iter()
        .skip_while(|l| l.text.trim().is_empty())
        .map(|mut l| {
            if default_male && l.speaker.is_none() {
                l.speaker = Some(SpeakerEntity::Male);
            }
            let is_translated = previous_start == Some(l.start);
            previous_start = Some(l.start);
            LyricLineHolder {
                lyric: l,
                is_translated,
            }
        })
        .collect();
    SemanticLyrics::Synced(lines)
}

/// Parses LRC text. Returns `None` for blank input.
pub fn parse_lrc(text: &str, trim: bool, multi_line: bool) -> Option<SemanticLyrics> {
    let tokens = token::tokenize(text, multi_line)?;
    Some(assemble(tokens, trim))
}

/// TTML is not supported yet.
pub fn parse_ttml(_text: &str, _trim: bool) -> Option<SemanticLyrics> {
    None
}

/// SRT is not supported yet.
pub fn parse_srt(_text: &str, _trim: bool) -> Option<SemanticLyrics> {
    None
}
