//! User accounts as seen by the game core.
//!
//! The game engine treats users as opaque identities with attached
//! [`Statistics`]; account management (credentials, contact details,
//! permissions) lives outside this crate.

pub mod statistics;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;
pub use statistics::Statistics;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub stats: Statistics,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            display_name: display_name.into(),
            stats: Statistics::new(),
            created_at: Utc::now(),
        }
    }
}

/// Weighted-average elo of a team, weighting each member by games played.
/// Falls back to the unweighted mean when nobody has completed a game.
#[must_use]
pub fn team_elo<'a>(users: impl IntoIterator<Item = &'a User>) -> f64 {
    let mut weighted = 0.0;
    let mut weight = 0.0;
    let mut total = 0.0;
    let mut count = 0.0;
    for user in users {
        let games = f64::from(user.stats.games_played());
        weighted += user.stats.elo * games;
        weight += games;
        total += user.stats.elo;
        count += 1.0;
    }
    if weight > 0.0 {
        weighted / weight
    } else if count > 0.0 {
        total / count
    } else {
        0.0
    }
}
