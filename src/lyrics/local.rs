//! Lyric files stored next to local audio files.

use anyhow::Context;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsFormat {
    Lrc,
    Ttml,
    Srt,
}

impl LyricsFormat {
    /// Sidecar extensions in lookup order.
    pub const ALL: [LyricsFormat; 3] = [Self::Lrc, Self::Ttml, Self::Srt];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Lrc => "lrc",
            Self::Ttml => "ttml",
            Self::Srt => "srt",
        }
    }

    /// Unknown extensions are read as LRC.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("ttml") => Self::Ttml,
            Some("srt") => Self::Srt,
            _ => Self::Lrc,
        }
    }
}

/// Lyric text together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLyrics {
    pub text: String,
    pub format: LyricsFormat,
    pub source: LyricsSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsSource {
    Database,
    File(PathBuf),
}

impl std::fmt::Display for LyricsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Reads a lyric file. A missing file is `Ok(None)`.
pub fn read_file(path: &Path) -> anyhow::Result<Option<RawLyrics>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(RawLyrics {
            text,
            format: LyricsFormat::from_path(path),
            source: LyricsSource::File(path.to_path_buf()),
        })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

/// Finds `<stem>.lrc`, `<stem>.ttml` or `<stem>.srt` beside an audio file.
pub fn find_sidecar(audio: &Path) -> anyhow::Result<Option<RawLyrics>> {
    for format in LyricsFormat::ALL {
        let candidate = audio.with_extension(format.extension());
        if candidate == audio {
            continue;
        }
        if let Some(raw) = read_file(&candidate)? {
            tracing::debug!(path = %candidate.display(), "found sidecar lyrics");
            return Ok(Some(raw));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(LyricsFormat::from_path(Path::new("a/b.lrc")), LyricsFormat::Lrc);
        assert_eq!(LyricsFormat::from_path(Path::new("b.TTML")), LyricsFormat::Ttml);
        assert_eq!(LyricsFormat::from_path(Path::new("b.srt")), LyricsFormat::Srt);
        assert_eq!(LyricsFormat::from_path(Path::new("b.txt")), LyricsFormat::Lrc);
        assert_eq!(LyricsFormat::from_path(Path::new("noext")), LyricsFormat::Lrc);
    }

    #[test]
    fn test_find_sidecar_prefers_lrc() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.flac");
        std::fs::write(dir.path().join("song.srt"), "srt").unwrap();
        std::fs::write(dir.path().join("song.lrc"), "[00:01.00]hi").unwrap();

        let raw = find_sidecar(&audio).unwrap().unwrap();
        assert_eq!(raw.format, LyricsFormat::Lrc);
        assert_eq!(raw.text, "[00:01.00]hi");
        assert_eq!(raw.source, LyricsSource::File(dir.path().join("song.lrc")));
    }

    #[test]
    fn test_find_sidecar_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_sidecar(&dir.path().join("song.mp3")).unwrap(), None);
    }

    #[test]
    fn test_find_sidecar_falls_back_to_ttml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("song.ttml"), "<tt/>").unwrap();
        let raw = find_sidecar(&dir.path().join("song.opus")).unwrap().unwrap();
        assert_eq!(raw.format, LyricsFormat::Ttml);
    }
}
