use serde::{Deserialize, Serialize};

use crate::models::{Direction, Message};
use crate::scope::AvatarScope;
use crate::wire::WireBytes;

/// Events delivered FROM the backend TO the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// A batch of messages for one chat. Direction is not labelled; the
    /// receiver infers it from the ids.
    MessageData {
        chat_id: String,
        messages: Vec<Message>,
    },

    /// Avatar bytes for a user or chat.
    AvatarData {
        scope: AvatarScope,
        bytes: WireBytes,
        mime_type: String,
        file_id: Option<String>,
    },

    /// The backend has no avatar for this scope.
    AvatarNotFound { scope: AvatarScope },
}

impl ServerEvent {
    /// Returns the chat this event is scoped to, if any.
    pub fn chat_id(&self) -> Option<&str> {
        match self {
            Self::MessageData { chat_id, .. } => Some(chat_id),
            _ => None,
        }
    }
}

/// Requests sent FROM the client TO the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    /// Page through a chat's history. `anchor_id` is exclusive: older pages
    /// end before it, newer pages start after it.
    FetchMessages {
        chat_id: String,
        direction: Direction,
        anchor_id: Option<i64>,
        limit: u32,
    },

    /// Ask for an avatar. The backend may answer with `AvatarNotFound`.
    FetchAvatar {
        scope: AvatarScope,
        expected_file_id: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_data_uses_type_and_data_tags() {
        let json = r#"{
            "type": "MessageData",
            "data": {
                "chat_id": "9",
                "messages": [
                    {"platformMessageId": "3", "chatId": "9", "platformTimestamp": "2024-01-01T00:00:00Z"}
                ]
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.chat_id(), Some("9"));
        match event {
            ServerEvent::MessageData { messages, .. } => assert_eq!(messages.len(), 1),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn avatar_data_accepts_wrapped_bytes() {
        let json = r#"{
            "type": "AvatarData",
            "data": {
                "scope": "user:12",
                "bytes": {"type": "Buffer", "data": [137, 80]},
                "mime_type": "image/png",
                "file_id": null
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(event.chat_id().is_none());
        match event {
            ServerEvent::AvatarData { scope, bytes, .. } => {
                assert_eq!(scope, AvatarScope::user("12"));
                assert_eq!(bytes.len(), 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn fetch_messages_serializes_direction_lowercase() {
        let cmd = ClientCommand::FetchMessages {
            chat_id: "1".into(),
            direction: Direction::Older,
            anchor_id: Some(10),
            limit: 50,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "FetchMessages");
        assert_eq!(json["data"]["direction"], "older");
    }
}
