//! Per-user gameplay statistics.
//!
//! Round recorders keep incremental averages over winning bets and counter
//! scores; game recorders maintain the game history, elo and rank. The elo
//! math follows the USCF rating algorithm with the effective-games
//! adjustment, plus the Wikipedia performance-rating formula for per-teammate
//! ratings in casual games.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{GameId, UserId};

/// Bids of the full 100 points are tracked separately as "twofers".
const TWOFER_BET: u32 = 100;

/// Elo never decays below this floor.
const ELO_FLOOR: f64 = 200.0;

/// Highest attainable rank.
const MAX_RANK: u32 = 14;

/// New accounts start here.
const STARTING_ELO: f64 = 800.0;

/// Rolling record for games played alongside one teammate.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TeamMateRecord {
    pub games: u32,
    pub rating: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Statistics {
    pub games_won: u32,
    pub games_lost: u32,
    /// Game ids, most recent first.
    pub history: Vec<GameId>,
    pub twofers: u32,
    pub won_bet_rounds: u32,
    pub lost_bet_rounds: u32,
    pub won_counter_rounds: u32,
    pub lost_counter_rounds: u32,
    pub avg_win_bet: f64,
    pub avg_counter_win: f64,
    pub team_mates: HashMap<UserId, TeamMateRecord>,
    pub elo: f64,
    pub rank: u32,
    pub ranked_wins: u32,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            games_won: 0,
            games_lost: 0,
            history: Vec::new(),
            twofers: 0,
            won_bet_rounds: 0,
            lost_bet_rounds: 0,
            won_counter_rounds: 0,
            lost_counter_rounds: 0,
            avg_win_bet: 0.0,
            avg_counter_win: 0.0,
            team_mates: HashMap::new(),
            elo: STARTING_ELO,
            rank: 1,
            ranked_wins: 0,
        }
    }
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn games_played(&self) -> u32 {
        self.games_won + self.games_lost
    }

    /// Record a round where this player's team made its bid.
    pub fn won_bet_round(&mut self, bet: u32) {
        self.avg_win_bet = incremental_avg(self.won_bet_rounds, self.avg_win_bet, f64::from(bet));
        self.won_bet_rounds += 1;
        if bet == TWOFER_BET {
            self.twofers += 1;
        }
    }

    /// Record a round where this player's team failed its bid.
    pub fn lost_bet_round(&mut self) {
        self.lost_bet_rounds += 1;
    }

    /// Record a round where this player's team set the bidding opponents,
    /// with the points denied to them.
    pub fn won_counter_round(&mut self, points: u32) {
        self.avg_counter_win =
            incremental_avg(self.won_counter_rounds, self.avg_counter_win, f64::from(points));
        self.won_counter_rounds += 1;
    }

    /// Record a round where the bidding opponents made their bid.
    pub fn lost_counter_round(&mut self) {
        self.lost_counter_rounds += 1;
    }

    /// Prepend a game to the history.
    pub fn add_game_to_history(&mut self, game_id: GameId) {
        self.history.insert(0, game_id);
    }

    /// Record a finished ranked game: USCF-style elo update with an elo
    /// floor, then rank derivation.
    pub fn record_ranked_game(
        &mut self,
        game_id: GameId,
        team_elo: f64,
        opposing_team_elo: f64,
        win: bool,
    ) {
        self.add_game_to_history(game_id);
        if win {
            self.games_won += 1;
            self.ranked_wins += 1;
        } else {
            self.games_lost += 1;
        }
        let change = elo_change(
            team_elo,
            self.games_played(),
            opposing_team_elo,
            win,
            self.ranked_wins,
        );
        self.elo = (self.elo + change).max(ELO_FLOOR);
        self.rank = elo_rank(self.elo, self.ranked_wins);
    }

    /// Record a finished casual game: flat ±1 elo with a floor, rank
    /// derivation and a per-teammate performance rating update.
    pub fn record_casual_game(
        &mut self,
        game_id: GameId,
        team_mate: UserId,
        opposing_team_elo: f64,
        win: bool,
    ) {
        self.add_game_to_history(game_id);
        if win {
            self.games_won += 1;
            self.elo += 1.0;
        } else {
            self.games_lost += 1;
            self.elo = (self.elo - 1.0).max(ELO_FLOOR);
        }
        self.rank = elo_rank(self.elo, self.ranked_wins);
        let record = self.team_mates.entry(team_mate).or_default();
        record.rating =
            performance_rating(record.games, record.rating, opposing_team_elo, win);
        record.games += 1;
    }

    /// Record a finished free-play game: history only.
    pub fn record_free_game(&mut self, game_id: GameId) {
        self.add_game_to_history(game_id);
    }
}

fn incremental_avg(count: u32, avg: f64, value: f64) -> f64 {
    if count == 0 {
        value
    } else {
        (f64::from(count) * avg + value) / (f64::from(count) + 1.0)
    }
}

/// Elo-based performance rating, adapted from the Wikipedia formulation:
/// each result contributes the opposing elo plus 400 for a win or minus
/// 400 for a loss, averaged over results.
fn performance_rating(count: u32, rating: f64, opposing_elo: f64, win: bool) -> f64 {
    let add = if win { 400.0 } else { -400.0 };
    if count == 0 {
        opposing_elo + add
    } else {
        (rating * f64::from(count) + opposing_elo + add) / (f64::from(count) + 1.0)
    }
}

/// Effective number of games for the k-factor, discounted for low-rated
/// players per the USCF algorithm.
fn effective_games(num_games: u32, player_elo: f64) -> f64 {
    if player_elo > 2355.0 {
        return f64::from(num_games);
    }
    let fifty = 50.0 / (0.662 + 0.000_007_39 * (2569.0 - player_elo).powi(2)).sqrt();
    let over_fifty = f64::from(num_games.saturating_sub(50)) - 50.0;
    over_fifty + (0.5 + fifty).floor()
}

/// Probability of the player beating the opponent.
fn prediction(player_elo: f64, opponent_elo: f64) -> f64 {
    let exponent = -(player_elo - opponent_elo) / 400.0;
    1.0 / (1.0 + 10f64.powf(exponent))
}

/// Linearized win probability used while a player is still provisional.
fn unranked_prediction(player_elo: f64, opponent_elo: f64) -> f64 {
    if player_elo >= opponent_elo + 400.0 {
        1.0
    } else if player_elo <= opponent_elo - 400.0 {
        0.0
    } else {
        0.5 + (player_elo - opponent_elo) / 800.0
    }
}

fn elo_change(
    player_elo: f64,
    num_games: u32,
    opponent_elo: f64,
    win: bool,
    num_games_won: u32,
) -> f64 {
    let outcome = if win { 1.0 } else { 0.0 };
    let mut games = effective_games(num_games, player_elo);
    let predicted = if num_games_won <= 10 {
        games += f64::from(num_games_won);
        unranked_prediction(player_elo, opponent_elo)
    } else {
        prediction(player_elo, opponent_elo)
    };
    let k_factor = 800.0 / games.max(1.0);
    k_factor * (outcome - predicted)
}

fn elo_rank(player_elo: f64, num_games_won: u32) -> u32 {
    if num_games_won < 10 {
        1
    } else {
        let rank = 1 + (player_elo / 200.0) as u32;
        rank.min(MAX_RANK)
    }
}
