//! Client-side glue between the transport and the core caches.
//!
//! Events from the backend are applied strictly in arrival order; message
//! batches land in the active chat's window, avatar payloads in the avatar
//! cache and handle layer.

pub mod avatars;
pub mod config;
pub mod dispatcher;
pub mod outbox;
pub mod session;
pub mod sweep;

pub use avatars::AvatarService;
pub use config::ClientConfig;
pub use dispatcher::{ClientState, run_dispatcher};
pub use outbox::Outbox;
pub use session::{AppliedBatch, ChatSession};
pub use sweep::run_sweep_loop;
