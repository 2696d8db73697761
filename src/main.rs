mod config;
mod lyrics;
mod storage;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lyrics::{LyricsHelper, SemanticLyrics, SongRef};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lyrix", version, about = "Synced lyrics parser and lookup")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep leading/trailing whitespace of lyric lines.
    #[arg(long, global = true)]
    no_trim: bool,

    /// Join physical lines between two timestamps into one lyric line.
    #[arg(long, global = true)]
    multi_line: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a lyric file and print its lines.
    Parse {
        file: PathBuf,
        /// Print the parsed structure as JSON.
        #[arg(long)]
        json: bool,
        /// Print flat timestamp/text entries instead.
        #[arg(long)]
        legacy: bool,
    },
    /// Print the line (and word) active at a playback position.
    At {
        file: PathBuf,
        /// Milliseconds, or mm:ss(.fff).
        position: String,
    },
    /// Resolve lyrics for a song from the database and sidecar files.
    Show {
        id: String,
        /// Local audio file to look for `.lrc`/`.ttml`/`.srt` files next to.
        #[arg(long)]
        audio: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Store lyrics from a file in the database.
    Store { id: String, file: PathBuf },
    /// Remove stored lyrics (or the not-found marker) of a song.
    Forget { id: String },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective config.
    Show,
    /// Set a `[lyrics]` option: trim, multi_line, prefer_local or cache_size.
    Set { key: String, value: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref()).context("load config")?;
    if cli.no_trim {
        cfg.lyrics.trim = false;
    }
    if cli.multi_line {
        cfg.lyrics.multi_line = true;
    }

    match cli.command {
        Command::Parse { file, json, legacy } => {
            let mut helper = LyricsHelper::new(None, cfg.lyrics.clone());
            let parsed = parse_file(&mut helper, &file)?;
            if legacy {
                let entries = lyrics::convert_for_legacy(parsed.as_ref());
                if json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else {
                    for e in entries {
                        let time = if e.time < 0 {
                            "--:--.---".to_string()
                        } else {
                            format_time(e.time as u64)
                        };
                        println!("[{time}] {}", e.text);
                    }
                }
            } else if json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                match &parsed {
                    Some(l) => print_lyrics(l),
                    None => println!("No lyrics in {}", file.display()),
                }
            }
        }
        Command::At { file, position } => {
            let position = parse_position(&position)?;
            let mut helper = LyricsHelper::new(None, cfg.lyrics.clone());
            let lyrics = parse_file(&mut helper, &file)?
                .filter(SemanticLyrics::is_synced)
                .with_context(|| format!("{} has no synced lyrics", file.display()))?;
            match lyrics.current_line(position) {
                Some(i) => {
                    let line = &lyrics.synced_lines()[i].lyric;
                    println!("[{}] {}", format_time(line.start), line.text);
                    if let Some(w) = line.current_word(position) {
                        let words = line.words.as_deref().unwrap_or_default();
                        println!("  word: {}", line.word_text(&words[w]));
                    }
                }
                None => println!("(before first line)"),
            }
        }
        Command::Show { id, audio, json } => {
            let storage = storage::Storage::open(&cfg.paths.database_path())?;
            let mut helper = LyricsHelper::new(Some(storage), cfg.lyrics.clone());
            let song = SongRef {
                id: &id,
                audio_path: audio.as_deref(),
            };
            let Some(raw) = helper.get_lyrics(&song)? else {
                println!("No lyrics found for {id}");
                return Ok(());
            };
            let parsed = helper.parse(&raw);
            if json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                println!("Source: {}", raw.source);
                match &parsed {
                    Some(l) => print_lyrics(l),
                    None => println!("Lyrics format not supported"),
                }
            }
        }
        Command::Store { id, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let storage = storage::Storage::open(&cfg.paths.database_path())?;
            storage.upsert_lyrics(&id, &text, storage::now_unix())?;
            println!("Stored lyrics for {id}.");
        }
        Command::Forget { id } => {
            let storage = storage::Storage::open(&cfg.paths.database_path())?;
            if storage.delete_lyrics(&id)? {
                println!("Removed lyrics for {id}.");
            } else {
                println!("Nothing stored for {id}.");
            }
        }
        Command::Config { cmd } => match cmd {
            ConfigCommand::Show => {
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
            ConfigCommand::Set { key, value } => {
                // Reload so command line overrides are not persisted.
                let mut cfg = config::load(cli.config.as_deref()).context("load config")?;
                set_lyrics_option(&mut cfg.lyrics, &key, &value)?;
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Updated {key}.");
            }
        },
    }

    Ok(())
}

fn parse_file(helper: &mut LyricsHelper, file: &Path) -> anyhow::Result<Option<SemanticLyrics>> {
    let raw = lyrics::local::read_file(file)?
        .with_context(|| format!("{} does not exist", file.display()))?;
    Ok(helper.parse(&raw))
}

fn set_lyrics_option(opts: &mut config::LyricsConfig, key: &str, value: &str) -> anyhow::Result<()> {
    let flag = || {
        value
            .parse::<bool>()
            .with_context(|| format!("{key} expects true or false"))
    };
    match key {
        "trim" => opts.trim = flag()?,
        "multi_line" => opts.multi_line = flag()?,
        "prefer_local" => opts.prefer_local = flag()?,
        "cache_size" => {
            opts.cache_size = value
                .parse()
                .with_context(|| format!("{key} expects a number"))?
        }
        _ => anyhow::bail!("unknown option {key}"),
    }
    Ok(())
}

fn format_time(ms: u64) -> String {
    format!("{:02}:{:02}.{:03}", ms / 60_000, ms / 1000 % 60, ms % 1000)
}

/// Accepts plain milliseconds or `mm:ss` with an optional `.fff` fraction.
fn parse_position(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(ms);
    }
    let (min, rest) = s
        .split_once(':')
        .with_context(|| format!("invalid position {s:?}"))?;
    let (sec, frac) = rest.split_once('.').unwrap_or((rest, ""));
    let min: u64 = min.parse().with_context(|| format!("invalid minutes in {s:?}"))?;
    let sec: u64 = sec.parse().with_context(|| format!("invalid seconds in {s:?}"))?;
    let mut millis = 0;
    for (scale, c) in [100, 10, 1].into_iter().zip(frac.chars()) {
        let d = c
            .to_digit(10)
            .with_context(|| format!("invalid fraction in {s:?}"))?;
        millis += u64::from(d) * scale;
    }
    Ok(min * 60_000 + sec * 1000 + millis)
}

fn print_lyrics(lyrics: &SemanticLyrics) {
    match lyrics {
        SemanticLyrics::Unsynced(lines) => {
            for l in lines {
                println!("{l}");
            }
        }
        SemanticLyrics::Synced(lines) => {
            for holder in lines {
                let l = &holder.lyric;
                let indent = if holder.is_translated { "    " } else { "" };
                let speaker = l
                    .speaker
                    .map(|s| format!("({}) ", s.label()))
                    .unwrap_or_default();
                let text = if l.speaker.is_some_and(|s| s.is_background()) {
                    format!("({})", l.text)
                } else {
                    l.text.clone()
                };
                let mut text_lines = text.lines();
                let first = text_lines.next().unwrap_or("");
                println!("{indent}[{}] {speaker}{first}", format_time(l.start));
                for cont in text_lines {
                    println!("{indent}            {cont}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "00:00.000");
        assert_eq!(format_time(11_220), "00:11.220");
        assert_eq!(format_time(61_005), "01:01.005");
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("1500").unwrap(), 1500);
        assert_eq!(parse_position("01:02").unwrap(), 62_000);
        assert_eq!(parse_position("00:11.22").unwrap(), 11_220);
        assert_eq!(parse_position("00:11.2").unwrap(), 11_200);
        assert!(parse_position("abc").is_err());
        assert!(parse_position("00:1x").is_err());
    }

    #[test]
    fn test_set_lyrics_option() {
        let mut opts = config::LyricsConfig::default();
        set_lyrics_option(&mut opts, "multi_line", "true").unwrap();
        set_lyrics_option(&mut opts, "cache_size", "4").unwrap();
        assert!(opts.multi_line);
        assert_eq!(opts.cache_size, 4);
        assert!(set_lyrics_option(&mut opts, "trim", "maybe").is_err());
        assert!(set_lyrics_option(&mut opts, "volume", "1").is_err());
    }
}
