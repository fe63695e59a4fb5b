//! Two-Hundred game core: cards, table state machine and game lifecycle.
//!
//! Everything in this module is synchronous and single-owner; concurrency
//! lives in [`crate::room`], which wraps each game in an actor.

pub mod cards;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod options;
pub mod player;
pub mod table;

pub use cards::{Card, CardHolder, Deck, DeckVariant, Rank, SortStrategy, Suit};
pub use controller::{Game, GameState, ScoreSheet};
pub use errors::{ErrorKind, GameError, GameResult};
pub use options::{GameOptions, SpectatorMode};
pub use player::{Player, Seats, Spectator, Team};
pub use table::{Table, TableState};
