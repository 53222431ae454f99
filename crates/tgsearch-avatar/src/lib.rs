//! Persistent TTL cache for user and chat avatars.
//!
//! - `store`: the key-value contract plus SQLite, in-memory and no-op backends
//! - `cache`: TTL reads/writes, validity checks, expiry and size sweeps
//! - `inflight`: per-scope fetch deduplication with drop-guard cleanup
//! - `handles`: in-memory layer that owns blob resource handles
//! - `clock`: injectable time source

pub mod cache;
pub mod clock;
pub mod handles;
pub mod inflight;
pub mod store;

pub use cache::{AvatarCache, DEFAULT_TTL_HOURS, FetchOutcome, FetchedAvatar, SweepReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use handles::{AvatarHandles, BlobHandle, BlobRegistry, MemoryBlobRegistry};
pub use inflight::{InFlight, InFlightGuard};
pub use store::{AvatarMeta, AvatarRecord, AvatarStore, MemoryStore, NullStore};
