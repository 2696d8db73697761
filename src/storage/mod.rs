use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// Stored for songs where every source came up empty, so they are not searched again.
pub const LYRICS_NOT_FOUND: &str = "LYRICS_NOT_FOUND";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS lyrics (
  id TEXT PRIMARY KEY,
  lyrics TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    /// Store lyrics for a song, replacing what was there
    pub fn upsert_lyrics(&self, id: &str, lyrics: &str, now_unix: i64) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO lyrics(id, lyrics, updated_at)
VALUES(?1, ?2, ?3)
ON CONFLICT(id) DO UPDATE SET
  lyrics=excluded.lyrics,
  updated_at=excluded.updated_at
"#,
                params![id, lyrics, now_unix],
            )
            .context("upsert lyrics")?;
        Ok(())
    }

    /// Get stored lyrics, including the not-found marker
    pub fn get_lyrics(&self, id: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT lyrics FROM lyrics WHERE id=?1", params![id], |row| {
                row.get(0)
            })
            .optional()
            .context("query lyrics")
    }

    /// Returns whether a row was removed
    pub fn delete_lyrics(&self, id: &str) -> anyhow::Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM lyrics WHERE id=?1", params![id])
            .context("delete lyrics")?;
        Ok(n > 0)
    }
}

pub fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
