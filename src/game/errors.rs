//! Game error taxonomy.
//!
//! Every fallible core operation validates before mutating and returns one of
//! these variants, so a rejected call leaves no partial state behind. The
//! [`ErrorKind`] classification is what transports surface to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::cards::Card;

pub type GameResult<T> = Result<T, GameError>;

/// Coarse classification of a [`GameError`], stable across variants.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Operation not legal in the current lifecycle state.
    State,
    /// Input violates a game rule.
    Validation,
    /// Referenced entity does not exist.
    NotFound,
    /// Setup or options problem.
    Configuration,
}

#[derive(Clone, Debug, Deserialize, Error, Eq, PartialEq, Serialize)]
pub enum GameError {
    #[error("operation `{operation}` is not allowed in state {state}")]
    InvalidState {
        operation: String,
        state: String,
    },
    #[error("it is not this player's turn")]
    OutOfTurn,
    #[error("nothing to resume: no paused state recorded")]
    NoPausedState,
    #[error("trump suit has not been chosen yet")]
    TrumpNotSet,
    #[error("trump suit has already been chosen")]
    TrumpAlreadySet,
    #[error("only the lead player may choose the trump suit")]
    NotLeadPlayer,
    #[error("the kitty must be buried before play continues")]
    DiscardRequired,
    #[error("no kitty discard is pending")]
    NoDiscardPending,
    #[error("discard of {actual} cards does not match the required {expected}")]
    InvalidDiscard { expected: usize, actual: usize },
    #[error("seat {0} does not exist")]
    InvalidSlot(usize),
    #[error("seat {0} is already taken")]
    SeatTaken(usize),
    #[error("user is already seated at this game")]
    UserAlreadySeated,
    #[error("bet of {0} is not a positive multiple of 5")]
    InvalidBetStep(u32),
    #[error("bet of {bet} does not beat the current high bid of {high}")]
    BetTooLow { bet: u32, high: u32 },
    #[error("card {0} is not in this player's hand")]
    CardNotHeld(Card),
    #[error("card {0} was not found")]
    CardNotFound(Card),
    #[error("requested {requested} cards but only {available} remain")]
    NotEnoughCards { requested: usize, available: usize },
    #[error("no sort strategy is configured for this card holder")]
    NoSortStrategy,
    #[error("unknown sort strategy `{0}`")]
    UnknownSortStrategy(String),
    #[error("player not found")]
    PlayerNotFound,
    #[error("spectator not found")]
    SpectatorNotFound,
    #[error("game {0} not found")]
    GameNotFound(Uuid),
    #[error("spectators are not allowed at this game")]
    SpectatorsDisabled,
    #[error("spectator capacity of {max} reached")]
    SpectatorCapacity { max: usize },
    #[error("the room is no longer running")]
    RoomClosed,
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("internal state inconsistency: {0}")]
    Inconsistency(String),
}

impl GameError {
    /// State guard failure for `operation` while in `state`.
    pub fn invalid_state(operation: &str, state: impl ToString) -> Self {
        Self::InvalidState {
            operation: operation.to_string(),
            state: state.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { .. }
            | Self::OutOfTurn
            | Self::NoPausedState
            | Self::TrumpNotSet
            | Self::TrumpAlreadySet
            | Self::NotLeadPlayer
            | Self::DiscardRequired
            | Self::NoDiscardPending
            | Self::SpectatorsDisabled
            | Self::RoomClosed => ErrorKind::State,
            Self::InvalidSlot(_)
            | Self::SeatTaken(_)
            | Self::UserAlreadySeated
            | Self::InvalidBetStep(_)
            | Self::BetTooLow { .. }
            | Self::InvalidDiscard { .. }
            | Self::CardNotHeld(_)
            | Self::NotEnoughCards { .. }
            | Self::SpectatorCapacity { .. } => ErrorKind::Validation,
            Self::CardNotFound(_)
            | Self::PlayerNotFound
            | Self::SpectatorNotFound
            | Self::GameNotFound(_) => ErrorKind::NotFound,
            Self::NoSortStrategy
            | Self::UnknownSortStrategy(_)
            | Self::Storage(_)
            | Self::Inconsistency(_) => ErrorKind::Configuration,
        }
    }
}
