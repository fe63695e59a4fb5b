//! Per-game execution contexts.
//!
//! Each live game runs inside a [`RoomActor`]: a single tokio task that
//! owns the [`crate::game::Game`] and applies commands from its inbox one
//! at a time. The [`RoomManager`] is the concurrent entry point: it routes
//! commands to rooms, restores cold games from the store and bounds the
//! number of live rooms.

pub mod actor;
pub mod manager;
pub mod messages;

pub use actor::{RoomActor, RoomHandle};
pub use manager::{DEFAULT_MAX_LIVE_ROOMS, RoomManager};
pub use messages::{RoomMessage, RoomNotification, RoomResponse, RoomSummary};
