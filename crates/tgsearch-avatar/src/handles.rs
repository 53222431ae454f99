//! In-memory avatar handles.
//!
//! The view layer renders avatars through resource handles (object URLs in a
//! browser, texture ids in a native UI). Handles are issued by a
//! `BlobRegistry` and must be released explicitly. `AvatarHandles` keeps one
//! handle per scope and releases the old one whenever it installs a new one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use bytes::Bytes;
use tgsearch_types::AvatarScope;
use tracing::{debug, warn};

use crate::cache::AvatarCache;
use crate::store::AvatarRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    pub id: u64,
    pub url: String,
}

pub trait BlobRegistry: Send + Sync {
    fn register(&self, blob: &Bytes, mime_type: &str) -> Result<BlobHandle>;
    fn release(&self, handle: &BlobHandle) -> Result<()>;
}

/// Registry that keeps blobs in a map and hands out `blob:tgsearch/<n>` urls.
#[derive(Default)]
pub struct MemoryBlobRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, (Bytes, String)>>,
}

impl MemoryBlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blob and MIME type behind a live handle.
    pub fn resolve(&self, handle: &BlobHandle) -> Option<(Bytes, String)> {
        self.live.lock().ok()?.get(&handle.id).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl BlobRegistry for MemoryBlobRegistry {
    fn register(&self, blob: &Bytes, mime_type: &str) -> Result<BlobHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live
            .lock()
            .map_err(|e| anyhow!("Blob registry lock poisoned: {}", e))?
            .insert(id, (blob.clone(), mime_type.to_string()));
        Ok(BlobHandle {
            id,
            url: format!("blob:tgsearch/{}", id),
        })
    }

    fn release(&self, handle: &BlobHandle) -> Result<()> {
        let removed = self
            .live
            .lock()
            .map_err(|e| anyhow!("Blob registry lock poisoned: {}", e))?
            .remove(&handle.id);
        match removed {
            Some(_) => Ok(()),
            None => Err(anyhow!("unknown blob handle {}", handle.url)),
        }
    }
}

/// One live handle per avatar scope.
///
/// Handles returned from here stay owned by `AvatarHandles`; callers borrow
/// them for rendering and must not release them.
pub struct AvatarHandles {
    registry: Arc<dyn BlobRegistry>,
    entries: HashMap<AvatarScope, BlobHandle>,
}

impl AvatarHandles {
    pub fn new(registry: Arc<dyn BlobRegistry>) -> Self {
        Self {
            registry,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, scope: &AvatarScope) -> Option<&BlobHandle> {
        self.entries.get(scope)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `record`'s blob and make it the handle for its scope.
    /// The previous handle for the scope, if any, is released first.
    pub fn install(&mut self, record: &AvatarRecord) -> Option<&BlobHandle> {
        let handle = match self.registry.register(&record.blob, &record.mime_type) {
            Ok(h) => h,
            Err(e) => {
                warn!(scope = %record.scope, "Failed to register avatar blob: {}", e);
                return self.entries.get(&record.scope);
            }
        };

        if let Some(previous) = self.entries.remove(&record.scope) {
            self.release(&record.scope, &previous);
        }

        debug!(scope = %record.scope, url = %handle.url, "Installed avatar handle");
        Some(self.entries.entry(record.scope.clone()).or_insert(handle))
    }

    /// Load `scope` from the cache and install it. Returns `None` on a miss.
    pub async fn hydrate(&mut self, cache: &AvatarCache, scope: &AvatarScope) -> Option<&BlobHandle> {
        let record = cache.load(scope).await?;
        self.install(&record)
    }

    /// Drop and release the handle for `scope`.
    pub fn evict(&mut self, scope: &AvatarScope) -> bool {
        match self.entries.remove(scope) {
            Some(handle) => {
                self.release(scope, &handle);
                true
            }
            None => false,
        }
    }

    /// Release every handle.
    pub fn clear(&mut self) {
        for (scope, handle) in std::mem::take(&mut self.entries) {
            self.release(&scope, &handle);
        }
    }

    fn release(&self, scope: &AvatarScope, handle: &BlobHandle) {
        if let Err(e) = self.registry.release(handle) {
            warn!(scope = %scope, url = %handle.url, "Failed to release avatar handle: {}", e);
        }
    }
}

impl Drop for AvatarHandles {
    fn drop(&mut self) {
        self.clear();
    }
}
