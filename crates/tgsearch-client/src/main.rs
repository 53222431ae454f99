use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tgsearch_avatar::{AvatarCache, MemoryBlobRegistry};
use tgsearch_client::{AvatarService, ChatSession, ClientConfig, ClientState, Outbox, run_dispatcher, run_sweep_loop};
use tgsearch_types::ServerEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tgsearch_client=debug,tgsearch_window=info,tgsearch_avatar=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let events_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: tgsearch-replay <events.jsonl> [chat_id]")?;
    let chat_arg = args.next();

    let config = ClientConfig::from_env();

    let raw = tokio::fs::read_to_string(&events_path)
        .await
        .with_context(|| format!("reading {}", events_path.display()))?;
    let events = parse_events(&raw);
    info!(path = %events_path.display(), events = events.len(), "Loaded event log");

    let Some(chat_id) = chat_arg.or_else(|| first_chat(&events)) else {
        warn!("No message batches in the log and no chat given; nothing to replay");
        return Ok(());
    };

    // Avatar cache
    let cache = AvatarCache::open(&config.avatar_db_path)
        .with_ttl(chrono::Duration::hours(config.avatar_ttl_hours));
    let sweeper = tokio::spawn(run_sweep_loop(
        cache.clone(),
        config.avatar_sweep_secs,
        config.avatar_max_bytes,
    ));

    // Outbound commands are logged instead of sent
    let (outbox, mut outbound) = Outbox::new(config.max_event_bytes);
    let printer = tokio::spawn(async move {
        let mut sent = 0usize;
        while let Some(payload) = outbound.recv().await {
            debug!(%payload, "Outbound command");
            sent += 1;
        }
        sent
    });

    let mut session = ChatSession::new(config.window_capacity)?;
    session.open(&chat_id, None)?;
    let avatars = AvatarService::new(cache, Arc::new(MemoryBlobRegistry::new()));
    let mut state = ClientState::new(session, avatars, outbox);

    let (tx, rx) = mpsc::channel(64);
    let feeder = tokio::spawn(async move {
        for event in events {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let applied = run_dispatcher(rx, &mut state).await;
    feeder.await?;

    let ids = state.session.sorted_ids();
    info!(
        chat_id = %chat_id,
        applied,
        resident = ids.len(),
        min_id = ?ids.first(),
        max_id = ?ids.last(),
        "Replay finished"
    );

    drop(state);
    let sent = printer.await?;
    info!(sent, "Outbound commands");
    sweeper.abort();

    Ok(())
}

fn parse_events(raw: &str) -> Vec<ServerEvent> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(line = n + 1, "Skipping unreadable event: {}", e);
                None
            }
        })
        .collect()
}

fn first_chat(events: &[ServerEvent]) -> Option<String> {
    events.iter().find_map(|event| event.chat_id().map(str::to_string))
}
