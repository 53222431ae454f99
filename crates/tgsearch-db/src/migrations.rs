use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Cache DB: running migration v1 (avatar cache)");
        conn.execute_batch(
            "
            CREATE TABLE avatar_cache (
                scope_id    TEXT PRIMARY KEY,
                owner_kind  TEXT NOT NULL,
                owner_id    TEXT NOT NULL,
                blob        BLOB NOT NULL,
                mime_type   TEXT NOT NULL,
                file_id     TEXT,
                created_at  INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_avatar_cache_expires
                ON avatar_cache(expires_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
