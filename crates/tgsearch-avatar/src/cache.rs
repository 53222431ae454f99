use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use tgsearch_db::Database;
use tgsearch_types::AvatarScope;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::inflight::InFlight;
use crate::store::{AvatarRecord, AvatarStore, NullStore};

/// Default record lifetime: 7 days.
pub const DEFAULT_TTL_HOURS: i64 = 168;

/// Avatar bytes obtained from the network, ready to be cached.
#[derive(Debug, Clone)]
pub struct FetchedAvatar {
    pub blob: Bytes,
    pub mime_type: String,
    pub file_id: Option<String>,
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// A fresh cached record satisfied the request; no fetch was made.
    Cached(AvatarRecord),
    /// The fetch ran and its result was persisted.
    Fetched(AvatarRecord),
    /// Another fetch for the same scope was already running.
    Coalesced,
    /// The backend has no avatar for this scope.
    NotFound,
    /// The fetch failed. The in-flight mark has been released.
    Failed,
}

/// Counts of records removed by a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub oversized: usize,
    pub remaining_bytes: u64,
}

/// TTL cache over an injected `AvatarStore`.
///
/// Store failures never reach the caller: reads degrade to misses and writes
/// are dropped, so the caller can always fall back to the network.
#[derive(Clone)]
pub struct AvatarCache {
    store: Arc<dyn AvatarStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    in_flight: InFlight,
}

impl AvatarCache {
    pub fn new(store: Arc<dyn AvatarStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            in_flight: InFlight::new(),
        }
    }

    /// Open the SQLite store at `path`, falling back to a no-op cache if it
    /// cannot be opened.
    pub fn open(path: &Path) -> Self {
        match Database::open(path) {
            Ok(db) => Self::new(Arc::new(db)),
            Err(e) => {
                warn!("Avatar cache unavailable at {}: {}. Continuing without persistence", path.display(), e);
                Self::disabled()
            }
        }
    }

    /// Cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullStore))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Upsert the record for `scope` with `expires_at = now + ttl`.
    ///
    /// Returns the record handed to the store, or `None` if the store call
    /// failed or the expiry is out of range. A no-op store accepts the
    /// write, so the record is still returned for in-memory use.
    pub async fn persist(
        &self,
        scope: &AvatarScope,
        blob: Bytes,
        mime_type: &str,
        file_id: Option<&str>,
    ) -> Option<AvatarRecord> {
        let now = self.clock.now();
        let Some(expires_at) = self.expiry_from(now) else {
            warn!(scope = %scope, ttl = %self.ttl, "Avatar TTL out of range, not persisting");
            return None;
        };
        let record = AvatarRecord {
            scope: scope.clone(),
            blob,
            mime_type: mime_type.to_string(),
            file_id: file_id.map(str::to_string),
            created_at: now,
            expires_at,
        };

        let to_store = record.clone();
        self.blocking("persist", move |store| store.upsert(&to_store))
            .await
            .map(|()| {
                debug!(scope = %scope, bytes = record.blob.len(), "Persisted avatar");
                record
            })
    }

    /// The record for `scope` if it exists and has not expired.
    pub async fn load(&self, scope: &AvatarScope) -> Option<AvatarRecord> {
        let key = scope.key();
        let record = self
            .blocking("load", move |store| store.get(&key))
            .await
            .flatten()?;

        if record.is_fresh_at(self.clock.now()) {
            Some(record)
        } else {
            debug!(scope = %scope, "Avatar record is stale");
            None
        }
    }

    /// True iff a fresh record exists and, when `expected_file_id` is given,
    /// its `file_id` matches.
    pub async fn has_valid(&self, scope: &AvatarScope, expected_file_id: Option<&str>) -> bool {
        match self.load(scope).await {
            Some(record) => matches_file_id(&record, expected_file_id),
            None => false,
        }
    }

    pub async fn remove(&self, scope: &AvatarScope) -> bool {
        let key = scope.key();
        self.blocking("remove", move |store| store.delete(&key))
            .await
            .unwrap_or(false)
    }

    /// Delete every expired record, then, if `max_bytes` is given, delete
    /// the records closest to expiry until the stored blobs fit the budget.
    ///
    /// Deletes are conditional on the expiry seen by the scan, so a record
    /// persisted while the sweep runs is never removed by it.
    pub async fn evict_expired_or_oversized(&self, max_bytes: Option<u64>) -> SweepReport {
        let now = self.clock.now();
        let Some(meta) = self.blocking("scan", |store| store.scan()).await else {
            return SweepReport::default();
        };

        let (expired, mut live): (Vec<_>, Vec<_>) =
            meta.into_iter().partition(|m| m.expires_at < now);
        live.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then_with(|| a.scope_id.cmp(&b.scope_id)));

        let mut remaining_bytes: u64 = live.iter().map(|m| m.byte_len).sum();
        let mut oversized = Vec::new();
        if let Some(budget) = max_bytes {
            for m in &live {
                if remaining_bytes <= budget {
                    break;
                }
                remaining_bytes -= m.byte_len;
                oversized.push(m.scope_id.clone());
            }
        }

        // Trimmed records expire no later than the last one picked; a refresh
        // pushes its record past that.
        let oversized_before = oversized
            .len()
            .checked_sub(1)
            .and_then(|last| live.get(last))
            .and_then(|m| m.expires_at.checked_add_signed(Duration::milliseconds(1)));

        let expired: Vec<String> = expired.into_iter().map(|m| m.scope_id).collect();
        let report = SweepReport {
            expired: self.delete_expiring(expired, now).await,
            oversized: match oversized_before {
                Some(before) => self.delete_expiring(oversized, before).await,
                None => 0,
            },
            remaining_bytes,
        };

        if report.expired > 0 || report.oversized > 0 {
            info!(
                expired = report.expired,
                oversized = report.oversized,
                remaining_bytes = report.remaining_bytes,
                "Avatar cache sweep"
            );
        }
        report
    }

    /// Serve `scope` from cache or run `fetch` once, coalescing concurrent
    /// requests for the same scope.
    pub async fn fetch_with<F, Fut>(
        &self,
        scope: &AvatarScope,
        expected_file_id: Option<&str>,
        fetch: F,
    ) -> FetchOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<FetchedAvatar>>>,
    {
        if let Some(record) = self.load(scope).await {
            if matches_file_id(&record, expected_file_id) {
                return FetchOutcome::Cached(record);
            }
        }

        let key = scope.key();
        let Some(_guard) = self.in_flight.try_begin(&key) else {
            return FetchOutcome::Coalesced;
        };

        match fetch().await {
            Ok(Some(fetched)) => {
                let persisted = self
                    .persist(scope, fetched.blob.clone(), &fetched.mime_type, fetched.file_id.as_deref())
                    .await;
                match persisted {
                    Some(record) => FetchOutcome::Fetched(record),
                    None => {
                        // Store rejected the write; hand the bytes back anyway.
                        let now = self.clock.now();
                        FetchOutcome::Fetched(AvatarRecord {
                            scope: scope.clone(),
                            blob: fetched.blob,
                            mime_type: fetched.mime_type,
                            file_id: fetched.file_id,
                            created_at: now,
                            expires_at: self.expiry_from(now).unwrap_or(now),
                        })
                    }
                }
            }
            Ok(None) => FetchOutcome::NotFound,
            Err(e) => {
                warn!(scope = %scope, "Avatar fetch failed: {}", e);
                FetchOutcome::Failed
            }
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_add_signed(self.ttl)
    }

    async fn delete_expiring(&self, scope_ids: Vec<String>, before: DateTime<Utc>) -> usize {
        if scope_ids.is_empty() {
            return 0;
        }
        self.blocking("evict", move |store| store.delete_expiring(&scope_ids, before))
            .await
            .unwrap_or(0)
    }

    /// Run a store call off the async runtime. Errors are logged and
    /// reported as `None`.
    async fn blocking<T, F>(&self, op: &'static str, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AvatarStore) -> anyhow::Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || f(store.as_ref())).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, "Avatar store error: {}", e);
                None
            }
            Err(e) => {
                warn!(op, "Avatar store task failed: {}", e);
                None
            }
        }
    }
}

fn matches_file_id(record: &AvatarRecord, expected: Option<&str>) -> bool {
    match expected {
        Some(expected) => record.file_id.as_deref() == Some(expected),
        None => true,
    }
}
