//! Syntactic pass over LRC text.
//!
//! Turns raw lyric text into a flat token stream without interpreting it.
//! Handles plain and compressed LRC, all-zero (invalid) timestamps, extended
//! word timestamps with or without line timestamps, Walaoke and iTunes speaker
//! tags, `[bg: ]` background segments and header metadata.

use super::model::SpeakerEntity;

/// Timestamps are milliseconds and do not include the `[offset:]` shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    SyncPoint(u64),
    WordSyncPoint(u64),
    SpeakerTag(SpeakerEntity),
    Metadata { name: String, value: String },
    LyricText(String),
    InvalidText(String),
    NewLine,
    /// A line break inferred from markup rather than present in the input.
    SyntheticNewLine,
}

impl Token {
    pub fn is_new_line(&self) -> bool {
        matches!(self, Self::NewLine | Self::SyntheticNewLine)
    }

    fn is_sync_point(&self) -> bool {
        matches!(self, Self::SyncPoint(_))
    }
}

const SPEAKER_TAGS: [(&str, SpeakerEntity); 10] = [
    ("v1:", SpeakerEntity::Voice1),
    ("v2:", SpeakerEntity::Voice2),
    ("F:", SpeakerEntity::Female),
    ("M:", SpeakerEntity::Male),
    ("D:", SpeakerEntity::Duet),
    (" v1:", SpeakerEntity::Voice1),
    (" v2:", SpeakerEntity::Voice2),
    (" F:", SpeakerEntity::Female),
    (" M:", SpeakerEntity::Male),
    (" D:", SpeakerEntity::Duet),
];

fn two_digits(s: &[u8]) -> Option<u64> {
    match s {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => {
            Some(u64::from(a - b'0') * 10 + u64::from(b - b'0'))
        }
        _ => None,
    }
}

/// Fraction digits to milliseconds. Digits past the third are truncated.
fn fraction_millis(digits: &[u8]) -> u64 {
    [100, 10, 1]
        .iter()
        .zip(digits)
        .map(|(scale, d)| u64::from(d - b'0') * scale)
        .sum()
}

/// Matches `<open>mm:ss<close>` with an optional `.fff` or `:fff` fraction.
/// Returns the time in milliseconds and the matched length in bytes.
fn time_mark(s: &str, open: u8, close: u8) -> Option<(u64, usize)> {
    let b = s.as_bytes();
    if b.len() < 7 || b[0] != open || b[3] != b':' {
        return None;
    }
    let minutes = two_digits(&b[1..3])?;
    let seconds = two_digits(&b[4..6])?;
    let mut i = 6;
    let mut millis = 0;
    if matches!(b.get(i), Some(b'.' | b':')) {
        let digits = b[i + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            millis = fraction_millis(&b[i + 1..i + 1 + digits]);
            i += 1 + digits;
        }
    }
    if b.get(i) != Some(&close) {
        return None;
    }
    Some((minutes * 60_000 + seconds * 1000 + millis, i + 1))
}

/// Matches `[name:value]` where the name is ASCII letters or `#`.
fn metadata(s: &str) -> Option<(&str, &str, usize)> {
    let inner = s.strip_prefix('[')?;
    let name_len = inner
        .bytes()
        .take_while(|c| c.is_ascii_alphabetic() || *c == b'#')
        .count();
    if name_len == 0 || inner.as_bytes().get(name_len) != Some(&b':') {
        return None;
    }
    let value_start = name_len + 1;
    let close = inner[value_start..].find(']')?;
    Some((
        &inner[..name_len],
        &inner[value_start..value_start + close],
        value_start + close + 2,
    ))
}

fn speaker_tag(s: &str) -> Option<(SpeakerEntity, usize)> {
    SPEAKER_TAGS
        .iter()
        .find(|(tag, _)| s.starts_with(tag))
        .map(|(tag, speaker)| (*speaker, tag.len()))
}

/// Whether the line being opened by `[bg:` follows a `v2:` line. Looks at the
/// speaker tags between the newline before the last token and the last token.
fn follows_voice2(out: &[Token]) -> bool {
    let Some((_, before_last)) = out.split_last() else {
        return false;
    };
    before_last
        .iter()
        .rposition(Token::is_new_line)
        .and_then(|nl| {
            before_last[nl..].iter().rev().find_map(|t| match t {
                Token::SpeakerTag(s) => Some(*s),
                _ => None,
            })
        })
        .is_some_and(SpeakerEntity::is_voice2)
}

/// Text only counts as lyric text when a timestamp was seen on its line.
fn push_text(out: &mut Vec<Token>, text: &str, is_lyric: bool) {
    match out.last_mut() {
        Some(Token::LyricText(prev)) if is_lyric => return prev.push_str(text),
        Some(Token::InvalidText(prev)) if !is_lyric => return prev.push_str(text),
        _ => {}
    }
    out.push(if is_lyric {
        Token::LyricText(text.to_string())
    } else {
        Token::InvalidText(text.to_string())
    });
}

/// Tokenizes LRC text. Returns `None` for blank input.
pub fn tokenize(text: &str, multi_line: bool) -> Option<Vec<Token>> {
    if text.trim().is_empty() {
        return None;
    }
    let mut pos = 0;
    let mut out: Vec<Token> = Vec::new();
    let mut in_bg = false;
    // Whether the current line has a timestamp, as of `out[..seen]`.
    let mut line_synced = false;
    let mut seen = 0;
    while pos < text.len() {
        let mut pending_bg_new_line = false;
        if in_bg && text[pos..].starts_with(']') {
            pos += 1;
            in_bg = false;
            pending_bg_new_line = true;
        }
        let rest = &text[pos..];
        if rest.starts_with("\r\n") {
            out.push(Token::NewLine);
            pos += 2;
            continue;
        }
        if rest.starts_with(['\n', '\r']) {
            out.push(Token::NewLine);
            pos += 1;
            continue;
        }
        if pending_bg_new_line {
            out.push(Token::SyntheticNewLine);
            continue;
        }
        if let Some((ts, len)) = time_mark(rest, b'[', b']') {
            // A line timestamp always starts a line, even when the text has none.
            if !out.last().is_some_and(|t| t.is_new_line() || t.is_sync_point()) {
                out.push(Token::SyntheticNewLine);
            }
            out.push(Token::SyncPoint(ts));
            pos += len;
            continue;
        }
        let after_sync = out.last().is_some_and(Token::is_sync_point);
        // Blanks between compressed timestamps carry no information.
        if after_sync && pos + 7 < text.len() {
            let ws = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            if ws > 0 && time_mark(&rest[ws..], b'[', b']').is_some() {
                pos += ws;
                continue;
            }
        }
        if after_sync && let Some((speaker, len)) = speaker_tag(rest) {
            out.push(Token::SpeakerTag(speaker));
            pos += len;
            continue;
        }
        if rest.starts_with("[bg:") {
            if out.last().is_some_and(|t| !t.is_new_line()) {
                out.push(Token::SyntheticNewLine);
            }
            let speaker = if follows_voice2(&out) {
                SpeakerEntity::Voice2Background
            } else {
                SpeakerEntity::Background
            };
            out.push(Token::SpeakerTag(speaker));
            pos += 4;
            in_bg = true;
            continue;
        }
        if out.last().is_none_or(Token::is_new_line)
            && let Some((name, value, len)) = metadata(rest)
        {
            out.push(Token::Metadata {
                name: name.to_string(),
                value: value.to_string(),
            });
            pos += len;
            continue;
        }
        if let Some((ts, len)) = time_mark(rest, b'<', b'>') {
            out.push(Token::WordSyncPoint(ts));
            pos += len;
            continue;
        }
        let end = rest
            .find(|c| matches!(c, '[' | '<' | '\r' | '\n') || (in_bg && c == ']'))
            .unwrap_or(rest.len());
        let end = if end == 0 {
            rest.chars().next().map_or(1, char::len_utf8)
        } else {
            end
        };
        for t in &out[seen..] {
            match t {
                Token::SyncPoint(_) | Token::WordSyncPoint(_) => line_synced = true,
                t if t.is_new_line() => line_synced = false,
                _ => {}
            }
        }
        seen = out.len();
        push_text(&mut out, &rest[..end], line_synced);
        pos += end;
    }
    if out.last().is_some_and(Token::is_sync_point) {
        out.push(Token::InvalidText(String::new()));
    }
    if out.last().is_some_and(|t| !t.is_new_line()) {
        out.push(Token::SyntheticNewLine);
    }
    let has_timing = out
        .iter()
        .any(|t| matches!(t, Token::SyncPoint(ts) | Token::WordSyncPoint(ts) if *ts > 0));
    if !has_timing {
        tracing::debug!("no positive timestamp, recovering plain text only");
        out = out
            .into_iter()
            .filter_map(|t| match t {
                Token::InvalidText(s) | Token::LyricText(s) => Some(Token::InvalidText(s)),
                _ => None,
            })
            .collect();
    }
    if multi_line {
        out = fold_multi_line(out);
    }
    Some(out)
}

/// Reads every physical line between two timestamps as text of the first one.
fn fold_multi_line(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut acc: Option<String> = None;
    for token in tokens {
        let Some(a) = acc.as_mut() else {
            match token {
                Token::LyricText(text) => acc = Some(text),
                t => out.push(t),
            }
            continue;
        };
        match token {
            Token::LyricText(text) | Token::InvalidText(text) => a.push_str(&text),
            t if t.is_new_line() => a.push('\n'),
            t => {
                let a = acc.take().unwrap_or_default();
                let trimmed = a.trim_end_matches('\n');
                out.push(Token::LyricText(trimmed.to_string()));
                out.extend((0..a.len() - trimmed.len()).map(|_| Token::NewLine));
                out.push(t);
            }
        }
    }
    if let Some(mut a) = acc {
        if a.ends_with('\n') {
            a.pop();
            out.push(Token::LyricText(a));
            out.push(Token::NewLine);
        } else {
            out.push(Token::LyricText(a));
        }
    }
    out
}
