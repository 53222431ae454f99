use crate::Database;
use crate::models::{AvatarMetaRow, AvatarRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Avatar cache --

    /// Insert or replace the record for `row.scope_id`.
    pub fn upsert_avatar(&self, row: &AvatarRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO avatar_cache
                    (scope_id, owner_kind, owner_id, blob, mime_type, file_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(scope_id) DO UPDATE SET
                    owner_kind = excluded.owner_kind,
                    owner_id   = excluded.owner_id,
                    blob       = excluded.blob,
                    mime_type  = excluded.mime_type,
                    file_id    = excluded.file_id,
                    created_at = excluded.created_at,
                    expires_at = excluded.expires_at",
                rusqlite::params![
                    row.scope_id,
                    row.owner_kind,
                    row.owner_id,
                    row.blob,
                    row.mime_type,
                    row.file_id,
                    row.created_at,
                    row.expires_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_avatar(&self, scope_id: &str) -> Result<Option<AvatarRow>> {
        self.with_conn(|conn| query_avatar(conn, scope_id))
    }

    /// Returns true if a record was deleted.
    pub fn delete_avatar(&self, scope_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM avatar_cache WHERE scope_id = ?1", [scope_id])?;
            Ok(n > 0)
        })
    }

    /// Delete the listed records that still expire before `before` (unix
    /// millis), in one transaction. Rows rewritten since the caller looked
    /// at them carry a later expiry and are kept. Returns how many went.
    pub fn delete_avatars_expiring(&self, scope_ids: &[String], before: i64) -> Result<usize> {
        if scope_ids.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut deleted = 0;
            {
                let mut stmt =
                    tx.prepare("DELETE FROM avatar_cache WHERE scope_id = ?1 AND expires_at < ?2")?;
                for id in scope_ids {
                    deleted += stmt.execute(rusqlite::params![id, before])?;
                }
            }
            tx.commit()?;
            Ok(deleted)
        })
    }

    /// Metadata of every cached avatar, oldest expiry first.
    pub fn list_avatar_meta(&self) -> Result<Vec<AvatarMetaRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT scope_id, LENGTH(blob), created_at, expires_at
                 FROM avatar_cache
                 ORDER BY expires_at ASC, scope_id ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AvatarMetaRow {
                        scope_id: row.get(0)?,
                        byte_len: row.get::<_, i64>(1)?.max(0) as u64,
                        created_at: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_avatars(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM avatar_cache", [], |r| r.get(0))?;
            Ok(n as usize)
        })
    }
}

fn query_avatar(conn: &Connection, scope_id: &str) -> Result<Option<AvatarRow>> {
    let mut stmt = conn.prepare(
        "SELECT scope_id, owner_kind, owner_id, blob, mime_type, file_id, created_at, expires_at
         FROM avatar_cache WHERE scope_id = ?1",
    )?;

    let row = stmt
        .query_row([scope_id], |row| {
            Ok(AvatarRow {
                scope_id: row.get(0)?,
                owner_kind: row.get(1)?,
                owner_id: row.get(2)?,
                blob: row.get(3)?,
                mime_type: row.get(4)?,
                file_id: row.get(5)?,
                created_at: row.get(6)?,
                expires_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(scope: &str, blob: &[u8], expires_at: i64) -> AvatarRow {
        AvatarRow {
            scope_id: scope.to_string(),
            owner_kind: "user".to_string(),
            owner_id: scope.trim_start_matches("user:").to_string(),
            blob: blob.to_vec(),
            mime_type: "image/jpeg".to_string(),
            file_id: Some("f1".to_string()),
            created_at: 0,
            expires_at,
        }
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_avatar(&row("user:1", b"old", 10)).unwrap();

        let mut newer = row("user:1", b"new", 20);
        newer.file_id = None;
        db.upsert_avatar(&newer).unwrap();

        assert_eq!(db.count_avatars().unwrap(), 1);
        let got = db.get_avatar("user:1").unwrap().unwrap();
        assert_eq!(got.blob, b"new");
        assert_eq!(got.expires_at, 20);
        assert!(got.file_id.is_none());
    }

    #[test]
    fn get_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_avatar("chat:9").unwrap().is_none());
    }

    #[test]
    fn delete_reports_presence() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_avatar(&row("user:1", b"x", 10)).unwrap();
        assert!(db.delete_avatar("user:1").unwrap());
        assert!(!db.delete_avatar("user:1").unwrap());
    }

    #[test]
    fn meta_scan_orders_by_expiry_and_reports_size() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_avatar(&row("user:a", b"12345", 30)).unwrap();
        db.upsert_avatar(&row("user:b", b"12", 10)).unwrap();

        let meta = db.list_avatar_meta().unwrap();
        let scopes: Vec<_> = meta.iter().map(|m| m.scope_id.as_str()).collect();
        assert_eq!(scopes, vec!["user:b", "user:a"]);
        assert_eq!(meta[0].byte_len, 2);
        assert_eq!(meta[1].byte_len, 5);
    }

    #[test]
    fn batch_delete_skips_missing_and_refreshed_rows() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_avatar(&row("user:a", b"1", 10)).unwrap();
        db.upsert_avatar(&row("user:b", b"1", 50)).unwrap();
        let n = db
            .delete_avatars_expiring(&["user:a".into(), "user:b".into(), "user:zz".into()], 20)
            .unwrap();
        assert_eq!(n, 1);
        assert!(db.get_avatar("user:a").unwrap().is_none());
        assert!(db.get_avatar("user:b").unwrap().is_some());
    }

    #[test]
    fn batch_delete_cutoff_is_exclusive() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_avatar(&row("user:a", b"1", 20)).unwrap();
        assert_eq!(db.delete_avatars_expiring(&["user:a".into()], 20).unwrap(), 0);
        assert_eq!(db.delete_avatars_expiring(&["user:a".into()], 21).unwrap(), 1);
    }

    #[test]
    fn migrations_are_rerunnable() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| crate::migrations::run(conn)).unwrap();
        db.upsert_avatar(&row("user:1", b"x", 1)).unwrap();
    }
}
