//! Game server core for Two-Hundred (200), a four-player trick-taking
//! card game played in fixed partnerships.
//!
//! The crate is layered:
//!
//! - [`game`] — the synchronous rules engine: deck and hands, the betting
//!   and trick-taking table, and the game lifecycle with settlement.
//! - [`notify`] — the change-notification bus every entity publishes on.
//! - [`users`] — user identities and gameplay statistics.
//! - [`store`] — the async document-store boundary used for explicit
//!   checkpoints and restores.
//! - [`room`] — one actor per live game plus the manager that routes
//!   commands, restores cold games and bounds resident rooms.
//!
//! A typical embedding creates a [`room::RoomManager`] over an
//! [`store::ObjectStore`] implementation and drives everything through it:
//!
//! ```no_run
//! use std::sync::Arc;
//! use two_hundred::{game::GameOptions, room::RoomManager, store::MemoryStore, users::User};
//!
//! # async fn demo() -> two_hundred::game::GameResult<()> {
//! let manager = RoomManager::new(Arc::new(MemoryStore::new()));
//! let host = User::new("host", "Host");
//! let game_id = manager.create_room(host, GameOptions::default()).await?;
//! manager.start_game(game_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod notify;
pub mod room;
pub mod store;
pub mod users;

use uuid::Uuid;

/// Identifier of a game.
pub type GameId = Uuid;

/// Identifier of a user account.
pub type UserId = Uuid;

/// Identifier of a seated player (stable across reconnects).
pub type PlayerId = Uuid;
