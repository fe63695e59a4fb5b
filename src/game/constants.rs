//! Fixed parameters of the Two-Hundred table.

/// Seats at a table. Seat parity determines the team.
pub const MAX_PLAYERS: usize = 4;

/// Cards set aside for the winning bidder each round.
pub const KITTY_SIZE: usize = 4;

/// Bids must be positive multiples of this step.
pub const BET_STEP: u32 = 5;

/// Total card points available in one round: four Fives, four Tens and
/// four Aces.
pub const ROUND_POINTS: u32 = 100;

/// Default score a team must reach to win the game.
pub const DEFAULT_WIN_AMOUNT: u32 = 200;

/// Default spectator capacity.
pub const DEFAULT_MAX_SPECTATORS: usize = 4;
