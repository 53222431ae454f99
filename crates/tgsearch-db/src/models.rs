//! Database row types. These map directly to SQLite rows and carry
//! timestamps as unix milliseconds; conversion to richer types happens in
//! the callers.

pub struct AvatarRow {
    pub scope_id: String,
    pub owner_kind: String,
    pub owner_id: String,
    pub blob: Vec<u8>,
    pub mime_type: String,
    pub file_id: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Everything about a cached avatar except the blob itself.
/// Returned by full scans so sweeps don't pull image bytes into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarMetaRow {
    pub scope_id: String,
    pub byte_len: u64,
    pub created_at: i64,
    pub expires_at: i64,
}
