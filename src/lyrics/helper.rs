//! Resolves lyrics for a song from the database and local files, and keeps
//! recent results in memory.

use super::local::{self, LyricsFormat, LyricsSource, RawLyrics};
use super::model::SemanticLyrics;
use super::semantic;
use crate::config::LyricsConfig;
use crate::storage::{self, LYRICS_NOT_FOUND, Storage};
use lru::LruCache;
use sha1::{Digest, Sha1};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, info};

/// The song lyrics are looked up for.
#[derive(Debug, Clone, Copy)]
pub struct SongRef<'a> {
    pub id: &'a str,
    /// Local audio file, used to find sidecar lyric files.
    pub audio_path: Option<&'a Path>,
}

pub struct LyricsHelper {
    storage: Option<Storage>,
    options: LyricsConfig,
    by_song: LruCache<String, RawLyrics>,
    parsed: LruCache<String, Option<SemanticLyrics>>,
}

impl LyricsHelper {
    pub fn new(storage: Option<Storage>, options: LyricsConfig) -> Self {
        let cap = NonZeroUsize::new(options.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            storage,
            options,
            by_song: LruCache::new(cap),
            parsed: LruCache::new(cap),
        }
    }

    /// Get the raw lyrics of a song.
    ///
    /// With `prefer_local` a sidecar file wins over the database, otherwise the
    /// database is asked first. When neither has lyrics the database remembers
    /// that with [`LYRICS_NOT_FOUND`].
    pub fn get_lyrics(&mut self, song: &SongRef<'_>) -> anyhow::Result<Option<RawLyrics>> {
        if let Some(cached) = self.by_song.get(song.id) {
            debug!(id = song.id, "lyrics cache hit");
            return Ok(Some(cached.clone()));
        }

        let db = self.database_lyrics(song.id)?;
        let found = if self.options.prefer_local {
            Self::local_lyrics(song)?.or(db)
        } else {
            match db {
                Some(raw) => Some(raw),
                None => Self::local_lyrics(song)?,
            }
        };

        match &found {
            Some(raw) => {
                info!(id = song.id, source = %raw.source, "resolved lyrics");
                self.by_song.put(song.id.to_string(), raw.clone());
            }
            None => {
                info!(id = song.id, "no lyrics found");
                if let Some(storage) = &self.storage {
                    storage.upsert_lyrics(song.id, LYRICS_NOT_FOUND, storage::now_unix())?;
                }
            }
        }
        Ok(found)
    }

    /// Parse raw lyrics with the configured options. Results are memoised per text.
    pub fn parse(&mut self, raw: &RawLyrics) -> Option<SemanticLyrics> {
        let key = self.cache_key(raw);
        if let Some(hit) = self.parsed.get(&key) {
            debug!(source = %raw.source, "parsed lyrics cache hit");
            return hit.clone();
        }

        let trim = self.options.trim;
        let parsed = match raw.format {
            LyricsFormat::Lrc => semantic::parse_lrc(&raw.text, trim, self.options.multi_line),
            LyricsFormat::Ttml => semantic::parse_ttml(&raw.text, trim),
            LyricsFormat::Srt => semantic::parse_srt(&raw.text, trim),
        };
        if parsed.is_none() {
            debug!(source = %raw.source, format = ?raw.format, "nothing parsed");
        }
        self.parsed.put(key, parsed.clone());
        parsed
    }

    fn database_lyrics(&self, id: &str) -> anyhow::Result<Option<RawLyrics>> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        Ok(storage
            .get_lyrics(id)?
            .filter(|text| text != LYRICS_NOT_FOUND)
            .map(|text| RawLyrics {
                text,
                format: LyricsFormat::Lrc,
                source: LyricsSource::Database,
            }))
    }

    fn local_lyrics(song: &SongRef<'_>) -> anyhow::Result<Option<RawLyrics>> {
        match song.audio_path {
            Some(path) => local::find_sidecar(path),
            None => Ok(None),
        }
    }

    fn cache_key(&self, raw: &RawLyrics) -> String {
        let mut hasher = Sha1::new();
        hasher.update(raw.format.extension().as_bytes());
        hasher.update([self.options.trim as u8, self.options.multi_line as u8]);
        hasher.update(raw.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(prefer_local: bool) -> LyricsConfig {
        LyricsConfig {
            prefer_local,
            ..LyricsConfig::default()
        }
    }

    #[test]
    fn test_database_lyrics() {
        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_lyrics("vid", "[00:01.00]from db", 0).unwrap();
        let mut helper = LyricsHelper::new(Some(storage), options(true));

        let song = SongRef { id: "vid", audio_path: None };
        let raw = helper.get_lyrics(&song).unwrap().unwrap();
        assert_eq!(raw.source, LyricsSource::Database);

        let lyrics = helper.parse(&raw).unwrap();
        assert_eq!(lyrics.unsynced_text(), vec!["from db".to_string()]);
    }

    #[test]
    fn test_prefer_local_order() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("track.mp3");
        std::fs::write(dir.path().join("track.lrc"), "[00:01.00]from file").unwrap();
        let song = SongRef { id: "vid", audio_path: Some(&audio) };

        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_lyrics("vid", "[00:01.00]from db", 0).unwrap();
        let mut local_first = LyricsHelper::new(Some(storage), options(true));
        let raw = local_first.get_lyrics(&song).unwrap().unwrap();
        assert_eq!(raw.source, LyricsSource::File(dir.path().join("track.lrc")));

        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_lyrics("vid", "[00:01.00]from db", 0).unwrap();
        let mut db_first = LyricsHelper::new(Some(storage), options(false));
        let raw = db_first.get_lyrics(&song).unwrap().unwrap();
        assert_eq!(raw.source, LyricsSource::Database);
    }

    #[test]
    fn test_not_found_is_recorded() {
        let mut helper = LyricsHelper::new(Some(Storage::open_in_memory().unwrap()), options(true));
        let song = SongRef { id: "missing", audio_path: None };
        assert_eq!(helper.get_lyrics(&song).unwrap(), None);

        let stored = helper.storage.as_ref().unwrap().get_lyrics("missing").unwrap();
        assert_eq!(stored.as_deref(), Some(LYRICS_NOT_FOUND));
        // The marker itself is never handed out as lyrics.
        assert_eq!(helper.get_lyrics(&song).unwrap(), None);
    }

    #[test]
    fn test_song_cache_survives_file_removal() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("track.mp3");
        let lrc = dir.path().join("track.lrc");
        std::fs::write(&lrc, "[00:01.00]cached").unwrap();
        let song = SongRef { id: "vid", audio_path: Some(&audio) };

        let mut helper = LyricsHelper::new(None, options(true));
        assert!(helper.get_lyrics(&song).unwrap().is_some());
        std::fs::remove_file(&lrc).unwrap();
        let raw = helper.get_lyrics(&song).unwrap().unwrap();
        assert_eq!(raw.text, "[00:01.00]cached");
    }

    #[test]
    fn test_parse_dispatches_on_format() {
        let mut helper = LyricsHelper::new(None, options(true));
        let ttml = RawLyrics {
            text: "<tt/>".to_string(),
            format: LyricsFormat::Ttml,
            source: LyricsSource::Database,
        };
        assert_eq!(helper.parse(&ttml), None);

        let lrc = RawLyrics {
            text: "[00:02.00] two \n".to_string(),
            format: LyricsFormat::Lrc,
            source: LyricsSource::Database,
        };
        let first = helper.parse(&lrc).unwrap();
        let again = helper.parse(&lrc).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.unsynced_text(), vec!["two".to_string()]);
    }

    #[test]
    fn test_cache_key_depends_on_options() {
        let raw = RawLyrics {
            text: "[00:01.00]x".to_string(),
            format: LyricsFormat::Lrc,
            source: LyricsSource::Database,
        };
        let trimmed = LyricsHelper::new(None, options(true));
        let untrimmed = LyricsHelper::new(
            None,
            LyricsConfig {
                trim: false,
                ..LyricsConfig::default()
            },
        );
        assert_ne!(trimmed.cache_key(&raw), untrimmed.cache_key(&raw));
        assert_eq!(trimmed.cache_key(&raw), trimmed.cache_key(&raw.clone()));
    }
}
