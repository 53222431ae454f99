use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use tgsearch_db::Database;
use tgsearch_db::models::{AvatarMetaRow, AvatarRow};
use tgsearch_types::AvatarScope;
use tracing::warn;

/// One cached avatar. Exactly one record exists per scope.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarRecord {
    pub scope: AvatarScope,
    pub blob: Bytes,
    pub mime_type: String,
    pub file_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AvatarRecord {
    /// A record is fresh up to and including its expiry instant.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

/// Record metadata returned by full scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarMeta {
    pub scope_id: String,
    pub byte_len: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Persistent key-value contract behind the avatar cache.
///
/// Implementations are blocking; the cache calls them from
/// `spawn_blocking`. Writes upsert by scope key, never append.
pub trait AvatarStore: Send + Sync {
    fn upsert(&self, record: &AvatarRecord) -> Result<()>;
    fn get(&self, scope_id: &str) -> Result<Option<AvatarRecord>>;
    fn delete(&self, scope_id: &str) -> Result<bool>;
    fn scan(&self) -> Result<Vec<AvatarMeta>>;

    /// Delete the listed records whose `expires_at` is still before
    /// `before`. A record refreshed after the caller scanned it survives.
    /// Returns the number deleted.
    fn delete_expiring(&self, scope_ids: &[String], before: DateTime<Utc>) -> Result<usize>;

    /// Whether writes can stick. False for the no-op store.
    fn is_persistent(&self) -> bool {
        true
    }
}

// -- SQLite --

impl AvatarStore for Database {
    fn upsert(&self, record: &AvatarRecord) -> Result<()> {
        self.upsert_avatar(&AvatarRow {
            scope_id: record.scope.key(),
            owner_kind: record.scope.kind().to_string(),
            owner_id: record.scope.owner_id().to_string(),
            blob: record.blob.to_vec(),
            mime_type: record.mime_type.clone(),
            file_id: record.file_id.clone(),
            created_at: record.created_at.timestamp_millis(),
            expires_at: record.expires_at.timestamp_millis(),
        })
    }

    fn get(&self, scope_id: &str) -> Result<Option<AvatarRecord>> {
        self.get_avatar(scope_id)?.map(record_from_row).transpose()
    }

    fn delete(&self, scope_id: &str) -> Result<bool> {
        self.delete_avatar(scope_id)
    }

    fn scan(&self) -> Result<Vec<AvatarMeta>> {
        self.list_avatar_meta()?
            .into_iter()
            .map(meta_from_row)
            .collect()
    }

    fn delete_expiring(&self, scope_ids: &[String], before: DateTime<Utc>) -> Result<usize> {
        self.delete_avatars_expiring(scope_ids, before.timestamp_millis())
    }
}

fn millis(ts: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .ok_or_else(|| anyhow!("timestamp out of range: {}", ts))
}

fn record_from_row(row: AvatarRow) -> Result<AvatarRecord> {
    let scope: AvatarScope = row.scope_id.parse()?;
    if scope.kind() != row.owner_kind || scope.owner_id() != row.owner_id {
        warn!(
            scope_id = %row.scope_id,
            owner_kind = %row.owner_kind,
            owner_id = %row.owner_id,
            "Avatar row owner does not match its scope key"
        );
    }

    Ok(AvatarRecord {
        scope,
        blob: Bytes::from(row.blob),
        mime_type: row.mime_type,
        file_id: row.file_id,
        created_at: millis(row.created_at)?,
        expires_at: millis(row.expires_at)?,
    })
}

fn meta_from_row(row: AvatarMetaRow) -> Result<AvatarMeta> {
    Ok(AvatarMeta {
        scope_id: row.scope_id,
        byte_len: row.byte_len,
        created_at: millis(row.created_at)?,
        expires_at: millis(row.expires_at)?,
    })
}

// -- In-memory --

/// Process-local store. Same semantics as the SQLite store, nothing survives
/// a restart.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, AvatarRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, AvatarRecord>>> {
        self.records
            .lock()
            .map_err(|e| anyhow!("Avatar store lock poisoned: {}", e))
    }
}

impl AvatarStore for MemoryStore {
    fn upsert(&self, record: &AvatarRecord) -> Result<()> {
        self.lock()?.insert(record.scope.key(), record.clone());
        Ok(())
    }

    fn get(&self, scope_id: &str) -> Result<Option<AvatarRecord>> {
        Ok(self.lock()?.get(scope_id).cloned())
    }

    fn delete(&self, scope_id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(scope_id).is_some())
    }

    fn scan(&self) -> Result<Vec<AvatarMeta>> {
        let mut meta: Vec<AvatarMeta> = self
            .lock()?
            .iter()
            .map(|(key, r)| AvatarMeta {
                scope_id: key.clone(),
                byte_len: r.blob.len() as u64,
                created_at: r.created_at,
                expires_at: r.expires_at,
            })
            .collect();
        meta.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.scope_id.cmp(&b.scope_id))
        });
        Ok(meta)
    }

    fn delete_expiring(&self, scope_ids: &[String], before: DateTime<Utc>) -> Result<usize> {
        let mut records = self.lock()?;
        let mut deleted = 0;
        for id in scope_ids {
            if records.get(id).is_some_and(|r| r.expires_at < before) {
                records.remove(id);
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

// -- No-op --

/// Stand-in used when no persistent store is available. Every read is a
/// miss and every write is silently dropped.
pub struct NullStore;

impl AvatarStore for NullStore {
    fn upsert(&self, _record: &AvatarRecord) -> Result<()> {
        Ok(())
    }

    fn get(&self, _scope_id: &str) -> Result<Option<AvatarRecord>> {
        Ok(None)
    }

    fn delete(&self, _scope_id: &str) -> Result<bool> {
        Ok(false)
    }

    fn scan(&self) -> Result<Vec<AvatarMeta>> {
        Ok(vec![])
    }

    fn delete_expiring(&self, _scope_ids: &[String], _before: DateTime<Utc>) -> Result<usize> {
        Ok(0)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
