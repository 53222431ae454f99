//! Shared data types for the tgsearch client core.
//!
//! Everything that crosses a crate boundary lives here: the message model,
//! the transport events, avatar scope keys and the outbound envelope budget.

pub mod envelope;
pub mod events;
pub mod models;
pub mod scope;
pub mod wire;

pub use envelope::{DropNotice, DropReason, encode_event};
pub use events::{ClientCommand, ServerEvent};
pub use models::{Direction, MediaRef, Message};
pub use scope::AvatarScope;
pub use wire::WireBytes;
