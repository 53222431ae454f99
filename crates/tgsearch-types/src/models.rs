use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wire::WireBytes;

/// A chat message as delivered by the search backend.
///
/// The core only cares about `platform_message_id`; everything else is
/// carried through untouched for the view layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Telegram message id, string-encoded. Strictly increasing within a chat.
    pub platform_message_id: String,
    pub chat_id: String,
    #[serde(default)]
    pub from_id: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub reply_to_id: Option<String>,
    pub platform_timestamp: DateTime<Utc>,
}

impl Message {
    /// Numeric identity used for window ordering.
    /// Returns `None` when the platform id is not an integer.
    pub fn numeric_id(&self) -> Option<i64> {
        self.platform_message_id.trim().parse().ok()
    }
}

/// Reference to a media attachment. Inline bytes are optional; large files
/// are fetched separately by `file_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub kind: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub bytes: Option<WireBytes>,
}

/// Position of a batch relative to the currently resident window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Defines (or redefines) the window contents.
    Initial,
    /// Entirely precedes the window.
    Older,
    /// Entirely follows the window.
    Newer,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::Older => "older",
            Self::Newer => "newer",
        };
        f.write_str(s)
    }
}
