//! Room actor message types.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::game::{Card, GameError, GameResult, GameState, ScoreSheet, Suit};
use crate::notify::Mutation;
use crate::users::User;
use crate::{GameId, UserId};

/// Messages that can be sent to a `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    /// Seat a user at a slot.
    AddPlayer {
        user: User,
        slot: usize,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Unseat a user (disconnect or voluntary leave).
    RemovePlayer {
        user_id: UserId,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Add a watcher.
    AddSpectator {
        user: User,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Remove a watcher.
    RemoveSpectator {
        user_id: UserId,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Deal the first round and begin play.
    StartGame {
        response: oneshot::Sender<RoomResponse>,
    },

    /// Place a bid (or pass with 0).
    Bet {
        user_id: UserId,
        amount: u32,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Bury the winning bidder's surplus cards after the kitty pickup.
    Discard {
        user_id: UserId,
        cards: Vec<Card>,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Choose the round's trump suit.
    SetTrumpSuit {
        user_id: UserId,
        suit: Suit,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Play a card into the current trick.
    PlayCard {
        user_id: UserId,
        card: Card,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Get a lightweight summary for lobby listings.
    GetSummary {
        response: oneshot::Sender<RoomSummary>,
    },

    /// Get the full persistable game document.
    GetSnapshot {
        response: oneshot::Sender<GameResult<serde_json::Value>>,
    },

    /// Subscribe to change notifications.
    Subscribe {
        user_id: UserId,
        sender: mpsc::Sender<RoomNotification>,
    },

    /// Unsubscribe from change notifications.
    Unsubscribe { user_id: UserId },

    /// Checkpoint the game and stop the actor.
    Close {
        response: oneshot::Sender<RoomResponse>,
    },
}

/// Response from room operations. Rejections carry the full game error;
/// the command that failed caused no state change and no notification.
#[derive(Clone, Debug)]
pub enum RoomResponse {
    Ok,
    Rejected(GameError),
}

impl RoomResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, RoomResponse::Ok)
    }

    pub fn into_result(self) -> GameResult<()> {
        match self {
            RoomResponse::Ok => Ok(()),
            RoomResponse::Rejected(err) => Err(err),
        }
    }
}

impl From<GameResult<()>> for RoomResponse {
    fn from(result: GameResult<()>) -> Self {
        match result {
            Ok(()) => RoomResponse::Ok,
            Err(err) => RoomResponse::Rejected(err),
        }
    }
}

/// Room state for lobby listings and reconnect screens.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomSummary {
    pub game_id: GameId,
    pub state: GameState,
    /// Current round number once play has started.
    pub round: Option<u32>,
    pub points: ScoreSheet,
    /// Display names by seat; `None` for an empty seat.
    pub players: Vec<Option<String>>,
    pub active_players: usize,
    pub spectator_count: usize,
}

/// A change event forwarded to room subscribers.
#[derive(Clone, Debug)]
pub struct RoomNotification {
    pub game_id: GameId,
    pub field: String,
    pub mutation: Mutation,
}
