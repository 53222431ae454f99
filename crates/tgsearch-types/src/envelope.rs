//! Outbound envelope budget.
//!
//! Payloads larger than the transport allows, or that fail to serialize,
//! are never sent. The caller learns about the drop through a callback.

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Oversize,
    Unserializable,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oversize => f.write_str("oversize"),
            Self::Unserializable => f.write_str("unserializable"),
        }
    }
}

/// Describes a dropped payload. `length` is the serialized size in bytes,
/// or 0 when serialization itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropNotice {
    pub length: usize,
    pub reason: DropReason,
}

/// Serialize `value` to JSON if it fits in `max_bytes`.
pub fn encode_event<T, F>(value: &T, max_bytes: usize, on_drop: F) -> Option<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(DropNotice),
{
    let encoded = match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => {
            warn!("Dropping unserializable payload: {}", e);
            on_drop(DropNotice {
                length: 0,
                reason: DropReason::Unserializable,
            });
            return None;
        }
    };

    if encoded.len() > max_bytes {
        warn!(length = encoded.len(), max_bytes, "Dropping oversize payload");
        on_drop(DropNotice {
            length: encoded.len(),
            reason: DropReason::Oversize,
        });
        return None;
    }

    Some(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn small_payload_passes_through() {
        let mut dropped = None;
        let out = encode_event(&vec![1, 2, 3], 64, |n| dropped = Some(n));
        assert_eq!(out.as_deref(), Some("[1,2,3]"));
        assert!(dropped.is_none());
    }

    #[test]
    fn oversize_payload_is_reported() {
        let mut dropped = None;
        let payload = "x".repeat(100);
        let out = encode_event(&payload, 10, |n| dropped = Some(n));
        assert!(out.is_none());
        assert_eq!(
            dropped,
            Some(DropNotice {
                length: 102,
                reason: DropReason::Oversize
            })
        );
    }

    #[test]
    fn unserializable_payload_is_reported() {
        // JSON object keys must be strings.
        let mut map = HashMap::new();
        map.insert((1, 2), "v");
        let mut dropped = None;
        let out = encode_event(&map, 1024, |n| dropped = Some(n));
        assert!(out.is_none());
        assert_eq!(dropped.map(|n| n.reason), Some(DropReason::Unserializable));
    }
}
