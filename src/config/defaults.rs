use super::{Config, LyricsConfig, PathsConfig};

/// Config written on first run.
pub fn defaults() -> Config {
    Config {
        lyrics: LyricsConfig::default(),
        paths: PathsConfig::default(),
    }
}
