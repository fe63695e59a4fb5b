//! Game lifecycle: seating, spectating, round settlement and game over.
//!
//! `Game` owns the seats and the table, delegates turn-taking to the table
//! and reacts when a round ends: it applies the settlement arithmetic to the
//! team score sheet, records round statistics, and either starts the next
//! round or finishes the game.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::cards::{Card, Deck, Suit};
use super::constants::{MAX_PLAYERS, ROUND_POINTS};
use super::errors::{GameError, GameResult};
use super::options::{GameOptions, SpectatorMode};
use super::player::{Player, Seats, Spectator, Team};
use super::table::{Table, TableState};
use crate::notify::{Mutation, Notifier};
use crate::users::{User, team_elo};
use crate::{GameId, PlayerId, UserId};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Created,
    Ready,
    Running,
    Paused,
    End,
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            GameState::Created => "CREATED",
            GameState::Ready => "READY",
            GameState::Running => "RUNNING",
            GameState::Paused => "PAUSED",
            GameState::End => "END",
        };
        write!(f, "{label}")
    }
}

/// Cumulative team scores. Failed bids can push a team negative.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScoreSheet {
    pub a: i32,
    pub b: i32,
}

impl ScoreSheet {
    #[must_use]
    pub fn get(&self, team: Team) -> i32 {
        match team {
            Team::A => self.a,
            Team::B => self.b,
        }
    }

    pub fn add(&mut self, team: Team, delta: i32) {
        match team {
            Team::A => self.a += delta,
            Team::B => self.b += delta,
        }
    }
}

/// Score deltas for a settled round. The bidding team must reach its bid
/// with its own discard pile; making the bid credits both teams their own
/// piles, failing it charges the bidding team the bid and credits nobody.
fn settlement_deltas(bet_team: Team, bet: u32, score_a: u32, score_b: u32) -> (bool, i32, i32) {
    let bidding_score = match bet_team {
        Team::A => score_a,
        Team::B => score_b,
    };
    if bidding_score >= bet {
        (true, score_a as i32, score_b as i32)
    } else {
        match bet_team {
            Team::A => (false, -(bet as i32), 0),
            Team::B => (false, 0, -(bet as i32)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Game {
    id: GameId,
    players: Seats,
    spectators: Vec<Spectator>,
    points: ScoreSheet,
    options: GameOptions,
    state: GameState,
    table: Option<Table>,
    winner: Option<Team>,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    notifier: Notifier,
}

impl Game {
    /// Create a game with the creating user seated at slot 0.
    #[must_use]
    pub fn new(creator: User, options: GameOptions) -> Self {
        let mut game = Self {
            id: Uuid::new_v4(),
            players: [None, None, None, None],
            spectators: Vec::new(),
            points: ScoreSheet::default(),
            options,
            state: GameState::Created,
            table: None,
            winner: None,
            created_at: Utc::now(),
            notifier: Notifier::new(),
        };
        let player = Player::new(creator, Team::for_seat(0));
        game.notifier.relay_from("players", player.notifier());
        game.players[0] = Some(player);
        game
    }

    #[must_use]
    pub fn id(&self) -> GameId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> GameState {
        self.state
    }

    #[must_use]
    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    #[must_use]
    pub fn points(&self) -> ScoreSheet {
        self.points
    }

    #[must_use]
    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    #[must_use]
    pub fn players(&self) -> &Seats {
        &self.players
    }

    #[must_use]
    pub fn spectators(&self) -> &[Spectator] {
        &self.spectators
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Seats occupied by a connected user.
    #[must_use]
    pub fn active_players(&self) -> usize {
        self.players
            .iter()
            .flatten()
            .filter(|p| !p.abandoned)
            .count()
    }

    #[must_use]
    pub fn player_by_user_id(&self, user_id: UserId) -> Option<&Player> {
        self.players
            .iter()
            .flatten()
            .find(|p| !p.abandoned && p.user_id() == user_id)
    }

    fn player_id_of(&self, user_id: UserId) -> GameResult<PlayerId> {
        self.player_by_user_id(user_id)
            .map(Player::id)
            .ok_or(GameError::PlayerNotFound)
    }

    fn set_state(&mut self, state: GameState) {
        self.state = state;
        self.notifier.emit("state", Mutation::Replace);
    }

    /// Seat a user. Before the first round this fills an empty slot; while
    /// paused it re-fills an abandoned seat, and play resumes once every
    /// seat is occupied again.
    pub fn add_player(&mut self, user: User, slot: usize) -> GameResult<()> {
        if slot >= MAX_PLAYERS {
            return Err(GameError::InvalidSlot(slot));
        }
        if self.player_by_user_id(user.id).is_some() {
            return Err(GameError::UserAlreadySeated);
        }
        match self.state {
            GameState::Created => {
                if self.players[slot].is_some() {
                    return Err(GameError::SeatTaken(slot));
                }
                let player = Player::new(user, Team::for_seat(slot));
                self.notifier.relay_from("players", player.notifier());
                self.players[slot] = Some(player);
                self.notifier
                    .emit("players", Mutation::Insert { index: slot });
                if self.active_players() == MAX_PLAYERS {
                    self.set_state(GameState::Ready);
                }
                Ok(())
            }
            GameState::Paused => {
                let seat = self.players[slot]
                    .as_mut()
                    .filter(|p| p.abandoned)
                    .ok_or(GameError::SeatTaken(slot))?;
                seat.assign_user(user);
                self.notifier
                    .emit("players", Mutation::Update { key: slot.to_string() });
                if self.active_players() == MAX_PLAYERS {
                    if let Some(table) = self.table.as_mut() {
                        table.resume()?;
                    }
                    self.set_state(GameState::Running);
                }
                Ok(())
            }
            state => {
                if self.players[slot].is_some() {
                    Err(GameError::SeatTaken(slot))
                } else {
                    Err(GameError::invalid_state("add_player", state))
                }
            }
        }
    }

    /// Unseat a user. Before the first round (and after the game ends) the
    /// seat empties; mid-game the seat is marked abandoned, keeping hand
    /// and identity for a replacement, and the game pauses.
    pub fn remove_player_by_user_id(&mut self, user_id: UserId) -> GameResult<()> {
        let slot = self
            .players
            .iter()
            .position(|p| {
                p.as_ref()
                    .is_some_and(|p| !p.abandoned && p.user_id() == user_id)
            })
            .ok_or(GameError::PlayerNotFound)?;
        match self.state {
            GameState::Running | GameState::Paused => {
                if let Some(player) = self.players[slot].as_mut() {
                    player.abandon();
                }
                self.notifier
                    .emit("players", Mutation::Update { key: slot.to_string() });
                if self.state == GameState::Running {
                    if let Some(table) = self.table.as_mut() {
                        table.pause()?;
                    }
                    self.set_state(GameState::Paused);
                }
                Ok(())
            }
            GameState::Created | GameState::Ready | GameState::End => {
                self.players[slot] = None;
                self.notifier
                    .emit("players", Mutation::Remove { index: slot });
                self.set_state(GameState::Created);
                Ok(())
            }
        }
    }

    pub fn add_spectator(&mut self, user: User) -> GameResult<()> {
        if self.options.spectator_mode == SpectatorMode::None {
            return Err(GameError::SpectatorsDisabled);
        }
        if self.spectators.len() >= self.options.max_spectators {
            return Err(GameError::SpectatorCapacity {
                max: self.options.max_spectators,
            });
        }
        self.spectators.push(Spectator::new(user));
        self.notifier.emit("spectators", Mutation::Append);
        Ok(())
    }

    pub fn remove_spectator_by_user_id(&mut self, user_id: UserId) -> GameResult<()> {
        let index = self
            .spectators
            .iter()
            .position(|s| s.user_id() == user_id)
            .ok_or(GameError::SpectatorNotFound)?;
        self.spectators.remove(index);
        self.notifier.emit("spectators", Mutation::Remove { index });
        Ok(())
    }

    /// Begin play: build a fresh table for round 1 and deal it. Legal from
    /// READY, and from END to rematch with the same seats.
    pub fn start_game(&mut self) -> GameResult<()> {
        if !matches!(self.state, GameState::Ready | GameState::End) {
            return Err(GameError::invalid_state("start_game", self.state));
        }
        let mut ids = [Uuid::nil(); MAX_PLAYERS];
        for (seat, slot) in self.players.iter().enumerate() {
            ids[seat] = slot
                .as_ref()
                .ok_or_else(|| GameError::Inconsistency(format!("seat {seat} empty at start")))?
                .id();
        }
        self.points = ScoreSheet::default();
        self.winner = None;
        self.notifier.emit("points", Mutation::Replace);
        let table = Table::new(ids, Deck::new(self.options.deck_variant()));
        self.notifier.relay_from("table", table.notifier());
        self.table = Some(table);
        if let Some(table) = self.table.as_mut() {
            table.setup(&mut self.players)?;
        }
        self.set_state(GameState::Running);
        Ok(())
    }

    /// Place a bid or pass for the user's player.
    pub fn bet(&mut self, user_id: UserId, amount: u32) -> GameResult<()> {
        let player = self.player_id_of(user_id)?;
        let table = self
            .table
            .as_mut()
            .ok_or_else(|| GameError::invalid_state("bet", self.state))?;
        table.bet(player, amount, &mut self.players)
    }

    /// Bury the winning bidder's surplus cards after the kitty pickup.
    pub fn discard(&mut self, user_id: UserId, cards: &[Card]) -> GameResult<()> {
        let player = self.player_id_of(user_id)?;
        let table = self
            .table
            .as_mut()
            .ok_or_else(|| GameError::invalid_state("discard", self.state))?;
        table.discard(player, cards, &mut self.players)
    }

    /// Choose the trump suit for the round.
    pub fn set_trump_suit(&mut self, user_id: UserId, suit: Suit) -> GameResult<()> {
        let player = self.player_id_of(user_id)?;
        let table = self
            .table
            .as_mut()
            .ok_or_else(|| GameError::invalid_state("set_trump_suit", self.state))?;
        table.set_trump_suit(player, suit)
    }

    /// Play a card; when it completes the round, the round settles and the
    /// game either continues with a new round or ends.
    pub fn play_card(&mut self, user_id: UserId, card: Card) -> GameResult<()> {
        let player = self.player_id_of(user_id)?;
        let table = self
            .table
            .as_mut()
            .ok_or_else(|| GameError::invalid_state("play_card", self.state))?;
        table.play_card(player, card, &mut self.players)?;
        let round_over = table.state() == TableState::End;
        if round_over {
            self.settle_round()?;
        }
        Ok(())
    }

    fn settle_round(&mut self) -> GameResult<()> {
        let (bet_team, bet_amount, score_a, score_b) = {
            let table = self
                .table
                .as_ref()
                .ok_or_else(|| GameError::Inconsistency("settling without a table".into()))?;
            let bet_team = table
                .bet_team()
                .ok_or_else(|| GameError::Inconsistency("settling without a bid".into()))?;
            (
                bet_team,
                table.bet_amount(),
                table.discards(Team::A).points(),
                table.discards(Team::B).points(),
            )
        };
        let (made, delta_a, delta_b) = settlement_deltas(bet_team, bet_amount, score_a, score_b);
        let bidding_score = match bet_team {
            Team::A => score_a,
            Team::B => score_b,
        };
        for player in self.players.iter_mut().flatten() {
            let stats = &mut player.user.stats;
            match (player.team == bet_team, made) {
                (true, true) => stats.won_bet_round(bet_amount),
                (true, false) => stats.lost_bet_round(),
                (false, true) => stats.lost_counter_round(),
                (false, false) => stats.won_counter_round(ROUND_POINTS - bidding_score),
            }
        }
        self.points.add(Team::A, delta_a);
        self.points.add(Team::B, delta_b);
        self.notifier.emit("points", Mutation::Replace);
        let target = self.options.win_amount as i32;
        if self.points.a >= target {
            self.end_game(Team::A)
        } else if self.points.b >= target {
            self.end_game(Team::B)
        } else if let Some(table) = self.table.as_mut() {
            table.restart(&mut self.players)
        } else {
            Ok(())
        }
    }

    fn end_game(&mut self, winning: Team) -> GameResult<()> {
        let elo_of = |team: Team| {
            team_elo(
                self.players
                    .iter()
                    .flatten()
                    .filter(|p| p.team == team)
                    .map(|p| &p.user),
            )
        };
        let opposing_elo = [elo_of(Team::B), elo_of(Team::A)]; // indexed by own team
        let mut team_mates = [None; MAX_PLAYERS];
        for seat in 0..MAX_PLAYERS {
            let mate = (seat + 2) % MAX_PLAYERS;
            team_mates[seat] = self.players[mate].as_ref().map(|p| p.user.id);
        }
        let game_id = self.id;
        for (seat, player) in self.players.iter_mut().enumerate() {
            let Some(player) = player else { continue };
            let mate = team_mates[seat]
                .ok_or_else(|| GameError::Inconsistency(format!("seat {seat} has no teammate")))?;
            let opposing = match player.team {
                Team::A => opposing_elo[0],
                Team::B => opposing_elo[1],
            };
            player
                .user
                .stats
                .record_casual_game(game_id, mate, opposing, player.team == winning);
        }
        self.winner = Some(winning);
        self.notifier.emit("winner", Mutation::Replace);
        self.set_state(GameState::End);
        Ok(())
    }

    /// Serialize the full game to a JSON document.
    pub fn snapshot(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Rebuild a game from a [`Game::snapshot`] document, re-attaching the
    /// notification relays that serialization drops.
    pub fn restore(doc: Value) -> serde_json::Result<Game> {
        let mut game: Game = serde_json::from_value(doc)?;
        game.wire();
        Ok(game)
    }

    fn wire(&mut self) {
        for player in self.players.iter_mut().flatten() {
            player.wire();
            self.notifier.relay_from("players", player.notifier());
        }
        if let Some(table) = self.table.as_ref() {
            self.notifier.relay_from("table", table.notifier());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::WILDCARD;

    fn four_users() -> Vec<User> {
        ["north", "east", "south", "west"]
            .iter()
            .map(|name| User::new(*name, *name))
            .collect()
    }

    fn full_game(options: GameOptions) -> (Vec<UserId>, Game) {
        let users = four_users();
        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let mut game = Game::new(users[0].clone(), options);
        for (slot, user) in users.into_iter().enumerate().skip(1) {
            game.add_player(user, slot).unwrap();
        }
        (ids, game)
    }

    fn user_at(game: &Game, seat: usize) -> UserId {
        game.players()[seat].as_ref().unwrap().user.id
    }

    /// Everyone passes; the survivor holds the (possibly zero) high bid.
    fn pass_out_bidding(game: &mut Game) {
        while game.table().unwrap().state() == TableState::Betting {
            let uid = user_at(game, game.table().unwrap().turn_seat());
            game.bet(uid, 0).unwrap();
        }
    }

    /// Play the round out with arbitrary legal cards.
    fn play_round_out(game: &mut Game) {
        let lead_seat = game.table().unwrap().lead_seat();
        let lead = user_at(game, lead_seat);
        let picks: Vec<Card> =
            game.players()[lead_seat].as_ref().unwrap().hand.cards()[..4].to_vec();
        game.discard(lead, &picks).unwrap();
        game.set_trump_suit(lead, Suit::Spades).unwrap();
        while game
            .table()
            .is_some_and(|t| t.state() == TableState::Playing)
        {
            let seat = game.table().unwrap().turn_seat();
            let uid = user_at(game, seat);
            let card = game.players()[seat].as_ref().unwrap().hand.cards()[0];
            game.play_card(uid, card).unwrap();
        }
    }

    #[test]
    fn test_new_game_seats_creator_at_slot_zero() {
        let creator = User::new("host", "Host");
        let creator_id = creator.id;
        let game = Game::new(creator, GameOptions::default());

        assert_eq!(game.state(), GameState::Created);
        assert_eq!(game.active_players(), 1);
        assert_eq!(game.players()[0].as_ref().unwrap().user_id(), creator_id);
        assert_eq!(game.players()[0].as_ref().unwrap().team, Team::A);
    }

    #[test]
    fn test_seat_validation() {
        let users = four_users();
        let duplicate = users[0].clone();
        let mut game = Game::new(users[0].clone(), GameOptions::default());

        assert_eq!(
            game.add_player(users[1].clone(), 4),
            Err(GameError::InvalidSlot(4))
        );
        assert_eq!(
            game.add_player(users[1].clone(), 0),
            Err(GameError::SeatTaken(0))
        );
        assert_eq!(
            game.add_player(duplicate, 1),
            Err(GameError::UserAlreadySeated)
        );
    }

    #[test]
    fn test_fourth_player_makes_game_ready() {
        let (_, game) = full_game(GameOptions::default());
        assert_eq!(game.state(), GameState::Ready);
    }

    #[test]
    fn test_start_game_requires_ready() {
        let mut game = Game::new(User::new("solo", "Solo"), GameOptions::default());
        assert!(matches!(
            game.start_game(),
            Err(GameError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_start_game_deals_and_runs() {
        let (_, mut game) = full_game(GameOptions::default());
        game.start_game().unwrap();

        assert_eq!(game.state(), GameState::Running);
        let table = game.table().unwrap();
        assert_eq!(table.state(), TableState::Betting);
        assert_eq!(table.round(), 1);
        assert!(matches!(
            game.start_game(),
            Err(GameError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_remove_before_start_empties_seat() {
        let (ids, mut game) = full_game(GameOptions::default());
        assert_eq!(game.state(), GameState::Ready);

        game.remove_player_by_user_id(ids[2]).unwrap();
        assert_eq!(game.state(), GameState::Created);
        assert!(game.players()[2].is_none());
        assert_eq!(
            game.remove_player_by_user_id(ids[2]),
            Err(GameError::PlayerNotFound)
        );
    }

    #[test]
    fn test_disconnect_pauses_and_reconnect_resumes() {
        let (ids, mut game) = full_game(GameOptions::default());
        game.start_game().unwrap();
        let identity = game.players()[2].as_ref().unwrap().id();
        let hand_size = game.players()[2].as_ref().unwrap().hand.len();

        game.remove_player_by_user_id(ids[2]).unwrap();
        assert_eq!(game.state(), GameState::Paused);
        assert_eq!(game.table().unwrap().state(), TableState::Paused);
        assert!(game.players()[2].as_ref().unwrap().abandoned);
        // Turn-taking is suspended while the seat is empty.
        assert!(matches!(
            game.bet(ids[1], 50),
            Err(GameError::InvalidState { .. })
        ));

        // A replacement takes over the abandoned seat and its hand.
        let replacement = User::new("sub", "Sub");
        let replacement_id = replacement.id;
        assert_eq!(
            game.add_player(User::new("x", "X"), 1),
            Err(GameError::SeatTaken(1))
        );
        game.add_player(replacement, 2).unwrap();

        assert_eq!(game.state(), GameState::Running);
        assert_eq!(game.table().unwrap().state(), TableState::Betting);
        let seat = game.players()[2].as_ref().unwrap();
        assert_eq!(seat.id(), identity);
        assert_eq!(seat.user_id(), replacement_id);
        assert_eq!(seat.hand.len(), hand_size);
    }

    #[test]
    fn test_spectator_rules() {
        let mut game = Game::new(
            User::new("host", "Host"),
            GameOptions {
                max_spectators: 1,
                ..GameOptions::default()
            },
        );
        game.add_spectator(User::new("watcher", "Watcher")).unwrap();
        assert_eq!(
            game.add_spectator(User::new("late", "Late")),
            Err(GameError::SpectatorCapacity { max: 1 })
        );
        let absent = Uuid::new_v4();
        assert_eq!(
            game.remove_spectator_by_user_id(absent),
            Err(GameError::SpectatorNotFound)
        );

        let mut closed = Game::new(
            User::new("host2", "Host2"),
            GameOptions {
                spectator_mode: SpectatorMode::None,
                ..GameOptions::default()
            },
        );
        assert_eq!(
            closed.add_spectator(User::new("watcher", "Watcher")),
            Err(GameError::SpectatorsDisabled)
        );
    }

    #[test]
    fn test_settlement_deltas_made_bid_credits_both_teams() {
        let (made, a, b) = settlement_deltas(Team::A, 60, 65, 35);
        assert!(made);
        assert_eq!((a, b), (65, 35));
    }

    #[test]
    fn test_settlement_deltas_failed_bid_charges_bidders_only() {
        let (made, a, b) = settlement_deltas(Team::A, 100, 90, 10);
        assert!(!made);
        assert_eq!((a, b), (-100, 0));
        assert_eq!(ROUND_POINTS - 90, 10);

        let (made, a, b) = settlement_deltas(Team::B, 55, 60, 40);
        assert!(!made);
        assert_eq!((a, b), (0, -55));
    }

    #[test]
    fn test_round_settles_and_next_round_starts() {
        let (_, mut game) = full_game(GameOptions::default());
        game.start_game().unwrap();
        pass_out_bidding(&mut game);
        play_round_out(&mut game);

        // Zero bid is trivially made, so both teams bank their piles.
        assert_eq!(game.state(), GameState::Running);
        let table = game.table().unwrap();
        assert_eq!(table.state(), TableState::Betting);
        assert_eq!(table.round(), 2);
        assert_eq!(table.lead_seat(), 2);
        let points = game.points();
        assert_eq!(points.a + points.b, 100);
        assert!(points.a >= 0 && points.b >= 0);
    }

    #[test]
    fn test_game_ends_when_a_team_reaches_the_target() {
        let (_, mut game) = full_game(GameOptions {
            win_amount: 1,
            ..GameOptions::default()
        });
        let game_id = game.id();
        game.start_game().unwrap();
        pass_out_bidding(&mut game);
        play_round_out(&mut game);

        assert_eq!(game.state(), GameState::End);
        let winner = game.winner().unwrap();
        assert!(game.points().get(winner) >= 1);
        for player in game.players().iter().flatten() {
            assert_eq!(player.user.stats.history, vec![game_id]);
            assert_eq!(player.user.stats.games_played(), 1);
        }
        let wins: u32 = game
            .players()
            .iter()
            .flatten()
            .map(|p| p.user.stats.games_won)
            .sum();
        assert_eq!(wins, 2);
    }

    #[test]
    fn test_snapshot_and_restore_preserve_play() {
        let (ids, mut game) = full_game(GameOptions::default());
        game.start_game().unwrap();
        game.bet(ids[1], 50).unwrap();

        let doc = game.snapshot().unwrap();
        let mut restored = Game::restore(doc).unwrap();

        assert_eq!(restored.id(), game.id());
        assert_eq!(restored.state(), GameState::Running);
        let table = restored.table().unwrap();
        assert_eq!(table.state(), TableState::Betting);
        assert_eq!(table.bet_amount(), 50);
        assert_eq!(table.turn_seat(), 2);

        // Relays survive the round trip: table changes surface on the game.
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        restored.notifier().subscribe(WILDCARD, move |event| {
            sink.lock().unwrap().push(event.field.clone());
        });
        restored.bet(ids[2], 55).unwrap();
        assert!(seen.lock().unwrap().iter().any(|field| field == "table"));
    }
}
