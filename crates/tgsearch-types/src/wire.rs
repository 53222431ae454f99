//! Byte payloads as they show up on the wire.
//!
//! Depending on which side serialized them, binary fields arrive either as a
//! bare JSON array of numbers or wrapped as `{ "type": "Buffer", "data": [...] }`.
//! Both shapes are accepted; `into_bytes` reconstructs the buffer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireBytes {
    /// Plain array of octets.
    Raw(Vec<u8>),
    /// Object wrapper with a `data` array and an optional type tag.
    Wrapped {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        data: Vec<u8>,
    },
}

impl WireBytes {
    pub fn len(&self) -> usize {
        match self {
            Self::Raw(data) | Self::Wrapped { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Raw(data) | Self::Wrapped { data, .. } => Bytes::from(data),
        }
    }
}

impl From<Vec<u8>> for WireBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::Raw(data)
    }
}
