//! Players, spectators and team assignment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cards::{CardHolder, SortStrategy};
use crate::notify::{Mutation, Notifier};
use crate::users::User;
use crate::{PlayerId, UserId};

/// The four seats split into two fixed partnerships by seat parity.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// Seats 0 and 2 form team A, seats 1 and 3 form team B.
    #[must_use]
    pub fn for_seat(seat: usize) -> Team {
        if seat % 2 == 0 { Team::A } else { Team::B }
    }

    #[must_use]
    pub fn opponent(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

/// A seated participant. The player identity survives the seated user
/// abandoning the game; a reconnecting or replacement user takes the
/// identity over and inherits the hand.
#[derive(Debug, Deserialize, Serialize)]
pub struct Player {
    id: PlayerId,
    pub user: User,
    pub team: Team,
    pub hand: CardHolder,
    pub abandoned: bool,
    #[serde(skip)]
    notifier: Notifier,
}

impl Player {
    #[must_use]
    pub fn new(user: User, team: Team) -> Self {
        let mut player = Self {
            id: Uuid::new_v4(),
            user,
            team,
            hand: CardHolder::new(Some(SortStrategy::Suit), true),
            abandoned: false,
            notifier: Notifier::new(),
        };
        player.wire();
        player
    }

    /// Re-attach the hand relay, required after deserialization.
    pub fn wire(&mut self) {
        self.notifier.relay_from("hand", self.hand.notifier());
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Mark the seat abandoned; the hand stays with the player identity.
    pub fn abandon(&mut self) {
        self.abandoned = true;
        self.notifier.emit("abandoned", Mutation::Replace);
    }

    /// Seat a user (back) at this player identity.
    pub fn assign_user(&mut self, user: User) {
        self.user = user;
        self.abandoned = false;
        self.notifier.emit("user", Mutation::Replace);
        self.notifier.emit("abandoned", Mutation::Replace);
    }
}

/// A non-seated watcher.
#[derive(Debug, Deserialize, Serialize)]
pub struct Spectator {
    id: Uuid,
    pub user: User,
}

impl Spectator {
    #[must_use]
    pub fn new(user: User) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

/// The four seats of a table. `None` marks a never-filled or hard-removed
/// seat; an abandoned seat keeps its `Player`.
pub type Seats = [Option<Player>; 4];
