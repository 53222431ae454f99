use std::time::Duration;

use tgsearch_avatar::AvatarCache;
use tracing::debug;

/// Background task that keeps the avatar cache within its TTL and byte
/// budget. Runs until the task is aborted.
pub async fn run_sweep_loop(cache: AvatarCache, interval_secs: u64, max_bytes: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        let report = cache.evict_expired_or_oversized(Some(max_bytes)).await;
        debug!(
            expired = report.expired,
            oversized = report.oversized,
            remaining_bytes = report.remaining_bytes,
            "Avatar sweep finished"
        );
    }
}
