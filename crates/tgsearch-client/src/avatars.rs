use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tgsearch_avatar::{AvatarCache, AvatarHandles, BlobHandle, BlobRegistry, InFlightGuard};
use tgsearch_types::{AvatarScope, ClientCommand, WireBytes};
use tokio::time::Instant;
use tracing::{debug, warn};

/// How long a fetch may stay unanswered before the scope can be requested
/// again.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An outstanding fetch and when it was sent.
struct Pending {
    _guard: InFlightGuard,
    sent_at: Instant,
}

/// Avatar flow for the client: cache lookups, deduplicated fetch requests,
/// and the handle layer the view renders from.
pub struct AvatarService {
    cache: AvatarCache,
    handles: AvatarHandles,
    /// Requests sent to the backend and not yet answered.
    pending: HashMap<AvatarScope, Pending>,
    request_timeout: Duration,
}

impl AvatarService {
    pub fn new(cache: AvatarCache, registry: Arc<dyn BlobRegistry>) -> Self {
        Self {
            cache,
            handles: AvatarHandles::new(registry),
            pending: HashMap::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Replace the deadline after which an unanswered request is dropped.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &AvatarCache {
        &self.cache
    }

    pub fn handle(&self, scope: &AvatarScope) -> Option<&BlobHandle> {
        self.handles.get(scope)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Make `scope`'s avatar available. Serves a valid cached copy directly;
    /// otherwise returns the fetch command to send, or `None` if a fetch for
    /// the scope is already outstanding.
    pub async fn request(
        &mut self,
        scope: &AvatarScope,
        expected_file_id: Option<&str>,
    ) -> Option<ClientCommand> {
        if self.cache.has_valid(scope, expected_file_id).await {
            if self.handles.get(scope).is_none() {
                self.handles.hydrate(&self.cache, scope).await;
            }
            return None;
        }

        let timed_out = self
            .pending
            .get(scope)
            .is_some_and(|p| p.sent_at.elapsed() >= self.request_timeout);
        if timed_out {
            warn!(scope = %scope, timeout = ?self.request_timeout, "Avatar request unanswered, retrying");
            self.pending.remove(scope);
        }

        let guard = self.cache.in_flight().try_begin(&scope.key())?;
        self.pending.insert(
            scope.clone(),
            Pending {
                _guard: guard,
                sent_at: Instant::now(),
            },
        );
        debug!(scope = %scope, "Requesting avatar");

        Some(ClientCommand::FetchAvatar {
            scope: scope.clone(),
            expected_file_id: expected_file_id.map(str::to_string),
        })
    }

    /// Backend delivered avatar bytes: persist them and swap the handle.
    pub async fn on_avatar_data(
        &mut self,
        scope: &AvatarScope,
        bytes: WireBytes,
        mime_type: &str,
        file_id: Option<&str>,
    ) -> Option<&BlobHandle> {
        // Release the in-flight mark whatever happens below.
        let _pending = self.pending.remove(scope);

        let record = self
            .cache
            .persist(scope, bytes.into_bytes(), mime_type, file_id)
            .await?;
        self.handles.install(&record)
    }

    /// Backend has no avatar for `scope`: forget any stale copy.
    pub async fn on_avatar_not_found(&mut self, scope: &AvatarScope) {
        let _pending = self.pending.remove(scope);
        self.handles.evict(scope);
        self.cache.remove(scope).await;
    }

    /// Give up on an outstanding request, e.g. after a transport timeout.
    pub fn cancel(&mut self, scope: &AvatarScope) -> bool {
        self.pending.remove(scope).is_some()
    }
}
