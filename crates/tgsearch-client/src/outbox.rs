use tgsearch_types::{ClientCommand, encode_event};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Outbound side of the transport. Commands are serialized under the
/// configured byte budget; anything that does not fit is dropped.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
    max_bytes: usize,
}

impl Outbox {
    pub fn new(max_bytes: usize) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, max_bytes }, rx)
    }

    /// Returns true if the command was queued.
    pub fn send(&self, command: &ClientCommand) -> bool {
        let Some(payload) = encode_event(command, self.max_bytes, |notice| {
            warn!(length = notice.length, reason = %notice.reason, "Outbound command dropped");
        }) else {
            return false;
        };

        debug!(bytes = payload.len(), "Queued outbound command");
        self.tx.send(payload).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgsearch_types::AvatarScope;

    #[test]
    fn queues_commands_within_budget() {
        let (outbox, mut rx) = Outbox::new(1024);
        let cmd = ClientCommand::FetchAvatar {
            scope: AvatarScope::user("1"),
            expected_file_id: None,
        };
        assert!(outbox.send(&cmd));
        let payload = rx.try_recv().unwrap();
        let back: ClientCommand = serde_json::from_str(&payload).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn drops_oversize_commands() {
        let (outbox, mut rx) = Outbox::new(8);
        let cmd = ClientCommand::FetchAvatar {
            scope: AvatarScope::chat("123456789"),
            expected_file_id: None,
        };
        assert!(!outbox.send(&cmd));
        assert!(rx.try_recv().is_err());
    }
}
