use tgsearch_types::{AvatarScope, Direction, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::avatars::AvatarService;
use crate::outbox::Outbox;
use crate::session::ChatSession;

/// Everything the event loop mutates. Owned by a single task, so no
/// locking is needed around the window.
pub struct ClientState {
    pub session: ChatSession,
    pub avatars: AvatarService,
    pub outbox: Outbox,
}

impl ClientState {
    pub fn new(session: ChatSession, avatars: AvatarService, outbox: Outbox) -> Self {
        Self {
            session,
            avatars,
            outbox,
        }
    }

    /// Apply one backend event. Completes all window mutation for the event
    /// before returning.
    pub async fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::MessageData { chat_id, messages } => {
                if let Some(applied) = self.session.apply_batch(&chat_id, &messages) {
                    debug!(
                        chat_id = %chat_id,
                        direction = %applied.direction,
                        reset = applied.reset,
                        resident = self.session.sorted_ids().len(),
                        "Applied message batch"
                    );
                }
            }
            ServerEvent::AvatarData {
                scope,
                bytes,
                mime_type,
                file_id,
            } => {
                self.avatars
                    .on_avatar_data(&scope, bytes, &mime_type, file_id.as_deref())
                    .await;
            }
            ServerEvent::AvatarNotFound { scope } => {
                self.avatars.on_avatar_not_found(&scope).await;
            }
        }
    }

    /// Ask for `scope`'s avatar unless it is cached or already requested.
    pub async fn request_avatar(&mut self, scope: &AvatarScope, expected_file_id: Option<&str>) -> bool {
        match self.avatars.request(scope, expected_file_id).await {
            Some(command) => {
                let sent = self.outbox.send(&command);
                if !sent {
                    self.avatars.cancel(scope);
                }
                sent
            }
            None => false,
        }
    }

    /// Ask for the next page of the open chat.
    pub fn request_page(&self, direction: Direction, limit: u32) -> bool {
        match self.session.next_page(direction, limit) {
            Some(command) => self.outbox.send(&command),
            None => false,
        }
    }
}

/// Drain `rx` in arrival order until every sender is gone. Returns the
/// number of events applied.
pub async fn run_dispatcher(mut rx: mpsc::Receiver<ServerEvent>, state: &mut ClientState) -> usize {
    let mut applied = 0;
    while let Some(event) = rx.recv().await {
        state.apply(event).await;
        applied += 1;
    }
    info!(events = applied, "Event stream closed");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tgsearch_avatar::{AvatarCache, MemoryBlobRegistry, MemoryStore};
    use tgsearch_types::{ClientCommand, Message};

    fn state() -> (ClientState, mpsc::UnboundedReceiver<String>) {
        let mut session = ChatSession::new(4).unwrap();
        session.open("chat", None).unwrap();
        let avatars = AvatarService::new(
            AvatarCache::new(Arc::new(MemoryStore::new())),
            Arc::new(MemoryBlobRegistry::new()),
        );
        let (outbox, rx) = Outbox::new(4096);
        (ClientState::new(session, avatars, outbox), rx)
    }

    fn batch(ids: &[i64]) -> ServerEvent {
        ServerEvent::MessageData {
            chat_id: "chat".into(),
            messages: ids
                .iter()
                .map(|id| Message {
                    platform_message_id: id.to_string(),
                    chat_id: "chat".into(),
                    from_id: None,
                    from_name: None,
                    content: String::new(),
                    media: vec![],
                    reply_to_id: None,
                    platform_timestamp: chrono::Utc::now(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn events_are_applied_in_order() {
        let (mut state, _out) = state();
        let (tx, rx) = mpsc::channel(16);
        tx.send(batch(&[50, 60])).await.unwrap();
        tx.send(batch(&[10, 20])).await.unwrap();
        tx.send(batch(&[70, 80, 90])).await.unwrap();
        drop(tx);

        let n = run_dispatcher(rx, &mut state).await;
        assert_eq!(n, 3);
        // initial [50,60], older [10,20], newer [70,80,90] trims 10,20,50
        assert_eq!(state.session.sorted_ids(), vec![60, 70, 80, 90]);
    }

    #[tokio::test]
    async fn avatar_request_round_trip() {
        let (mut state, mut out) = state();
        let scope = AvatarScope::user("42");

        assert!(state.request_avatar(&scope, None).await);
        assert!(!state.request_avatar(&scope, None).await);

        let sent: ClientCommand = serde_json::from_str(&out.try_recv().unwrap()).unwrap();
        assert!(matches!(sent, ClientCommand::FetchAvatar { .. }));
        assert!(out.try_recv().is_err());

        state
            .apply(ServerEvent::AvatarData {
                scope: scope.clone(),
                bytes: vec![1, 2, 3].into(),
                mime_type: "image/png".into(),
                file_id: None,
            })
            .await;
        assert!(state.avatars.handle(&scope).is_some());
        assert!(!state.request_avatar(&scope, None).await, "served from cache");
    }

    #[tokio::test]
    async fn page_request_uses_window_edge() {
        let (mut state, mut out) = state();
        state.apply(batch(&[5, 6])).await;
        assert!(state.request_page(Direction::Older, 10));

        let sent: ClientCommand = serde_json::from_str(&out.try_recv().unwrap()).unwrap();
        match sent {
            ClientCommand::FetchMessages { anchor_id, direction, .. } => {
                assert_eq!(anchor_id, Some(5));
                assert_eq!(direction, Direction::Older);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
