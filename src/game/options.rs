//! Per-game options chosen at creation time.

use serde::{Deserialize, Serialize};

use super::cards::DeckVariant;
use super::constants::{DEFAULT_MAX_SPECTATORS, DEFAULT_WIN_AMOUNT};

/// What spectators are allowed to do at the table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectatorMode {
    /// Spectating disabled.
    None,
    /// Watch the table only.
    Standard,
    /// Watch and see one chosen player's hand.
    Active,
    /// Watch with every hand visible.
    All,
}

impl std::fmt::Display for SpectatorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectatorMode::None => write!(f, "none"),
            SpectatorMode::Standard => write!(f, "standard"),
            SpectatorMode::Active => write!(f, "active"),
            SpectatorMode::All => write!(f, "all"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameOptions {
    /// Play with the 40-card deck that includes Sixes.
    pub sixes: bool,
    pub spectator_mode: SpectatorMode,
    pub spectator_chat: bool,
    pub max_spectators: usize,
    /// Score a team must reach to win.
    pub win_amount: u32,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            sixes: false,
            spectator_mode: SpectatorMode::Standard,
            spectator_chat: true,
            max_spectators: DEFAULT_MAX_SPECTATORS,
            win_amount: DEFAULT_WIN_AMOUNT,
        }
    }
}

impl GameOptions {
    #[must_use]
    pub fn deck_variant(&self) -> DeckVariant {
        if self.sixes {
            DeckVariant::Sixes
        } else {
            DeckVariant::Original
        }
    }
}
