//! The table: betting and trick-taking for one or more rounds.
//!
//! A `Table` references its players by id; hand access goes through the
//! [`Seats`] registry owned by the enclosing game, which passes it into the
//! operations that touch hands. All guards run before any mutation, so a
//! rejected call leaves the table untouched.

use serde::{Deserialize, Serialize};

use super::cards::{Card, CardHolder, Deck, SortStrategy, Suit};
use super::constants::{BET_STEP, KITTY_SIZE, MAX_PLAYERS};
use super::errors::{GameError, GameResult};
use super::player::{Seats, Team};
use crate::PlayerId;
use crate::notify::{Mutation, Notifier};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableState {
    Created,
    Betting,
    Playing,
    Paused,
    End,
}

impl std::fmt::Display for TableState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TableState::Created => "CREATED",
            TableState::Betting => "BETTING",
            TableState::Playing => "PLAYING",
            TableState::Paused => "PAUSED",
            TableState::End => "END",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Table {
    deck: Deck,
    seats: [PlayerId; MAX_PLAYERS],
    kitty: CardHolder,
    trick: [Option<Card>; MAX_PLAYERS],
    discards_a: CardHolder,
    discards_b: CardHolder,
    trump: Option<Suit>,
    /// Set while the winning bidder holds the kitty and must bury cards
    /// before trump selection.
    pending_discard: bool,
    /// Seats still allowed to bid this round.
    bidders: [bool; MAX_PLAYERS],
    bet_amount: u32,
    bet_team: Option<Team>,
    turn: usize,
    lead: usize,
    round: u32,
    state: TableState,
    prev_state: Option<TableState>,
    #[serde(skip)]
    notifier: Notifier,
}

impl Table {
    /// A fresh table for round 1. [`Table::setup`] deals it.
    #[must_use]
    pub fn new(seats: [PlayerId; MAX_PLAYERS], deck: Deck) -> Self {
        let round = 1;
        let lead = round as usize % MAX_PLAYERS;
        Self {
            deck,
            seats,
            kitty: CardHolder::new(None, true),
            trick: [None; MAX_PLAYERS],
            discards_a: CardHolder::new(Some(SortStrategy::Value), true),
            discards_b: CardHolder::new(Some(SortStrategy::Value), true),
            trump: None,
            pending_discard: false,
            bidders: [true; MAX_PLAYERS],
            bet_amount: 0,
            bet_team: None,
            turn: lead,
            lead,
            round,
            state: TableState::Created,
            prev_state: None,
            notifier: Notifier::new(),
        }
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    #[must_use]
    pub fn state(&self) -> TableState {
        self.state
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn lead_seat(&self) -> usize {
        self.lead
    }

    #[must_use]
    pub fn turn_seat(&self) -> usize {
        self.turn
    }

    /// Id of the player whose turn it is.
    #[must_use]
    pub fn turn_player(&self) -> PlayerId {
        self.seats[self.turn]
    }

    #[must_use]
    pub fn trump(&self) -> Option<Suit> {
        self.trump
    }

    #[must_use]
    pub fn bet_amount(&self) -> u32 {
        self.bet_amount
    }

    /// Whether the winning bidder still has to bury the kitty cards.
    #[must_use]
    pub fn pending_discard(&self) -> bool {
        self.pending_discard
    }

    #[must_use]
    pub fn bet_team(&self) -> Option<Team> {
        self.bet_team
    }

    #[must_use]
    pub fn kitty(&self) -> &CardHolder {
        &self.kitty
    }

    #[must_use]
    pub fn trick(&self) -> &[Option<Card>; MAX_PLAYERS] {
        &self.trick
    }

    #[must_use]
    pub fn discards(&self, team: Team) -> &CardHolder {
        match team {
            Team::A => &self.discards_a,
            Team::B => &self.discards_b,
        }
    }

    #[must_use]
    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    fn seat_of(&self, player: PlayerId) -> GameResult<usize> {
        self.seats
            .iter()
            .position(|&id| id == player)
            .ok_or(GameError::PlayerNotFound)
    }

    fn hand_of<'a>(seats: &'a mut Seats, player: PlayerId) -> GameResult<&'a mut CardHolder> {
        seats
            .iter_mut()
            .flatten()
            .find(|p| p.id() == player)
            .map(|p| &mut p.hand)
            .ok_or(GameError::PlayerNotFound)
    }

    fn set_state(&mut self, state: TableState) {
        self.state = state;
        self.notifier.emit("state", Mutation::Replace);
    }

    fn set_turn(&mut self, seat: usize) {
        self.turn = seat;
        self.notifier.emit("turn", Mutation::Replace);
    }

    /// Shuffle, set the kitty aside and deal the rest evenly, starting at
    /// the round's lead seat. Moves the table into betting.
    pub fn setup(&mut self, seats: &mut Seats) -> GameResult<()> {
        if self.state != TableState::Created {
            return Err(GameError::invalid_state("setup", self.state));
        }
        self.deck.shuffle();
        for card in self.deck.deal_cards(KITTY_SIZE)? {
            self.kitty.push_card(card);
        }
        self.notifier.emit("kitty", Mutation::Replace);
        while !self.deck.is_empty() {
            for offset in 0..MAX_PLAYERS {
                let seat = (self.lead + offset) % MAX_PLAYERS;
                let card = self.deck.deal_card()?;
                Self::hand_of(seats, self.seats[seat])?.push_card(card);
            }
        }
        self.bidders = [true; MAX_PLAYERS];
        self.set_turn(self.lead);
        self.set_state(TableState::Betting);
        Ok(())
    }

    /// Record a bid (a positive multiple of 5 beating the current high
    /// bid) or a pass (0, which removes the seat from bidding). Betting
    /// ends when a single active bidder remains.
    pub fn bet(&mut self, player: PlayerId, amount: u32, seats: &mut Seats) -> GameResult<()> {
        if self.state != TableState::Betting {
            return Err(GameError::invalid_state("bet", self.state));
        }
        let seat = self.seat_of(player)?;
        if seat != self.turn {
            return Err(GameError::OutOfTurn);
        }
        if amount == 0 {
            self.bidders[seat] = false;
            self.notifier
                .emit("bidders", Mutation::Remove { index: seat });
        } else {
            if amount % BET_STEP != 0 {
                return Err(GameError::InvalidBetStep(amount));
            }
            if amount <= self.bet_amount {
                return Err(GameError::BetTooLow {
                    bet: amount,
                    high: self.bet_amount,
                });
            }
            self.bet_amount = amount;
            self.bet_team = Some(Team::for_seat(seat));
            self.notifier.emit("bet_amount", Mutation::Replace);
            self.notifier.emit("bet_team", Mutation::Replace);
        }
        let active = self.bidders.iter().filter(|&&b| b).count();
        if active == 1 {
            self.end_betting(seats)
        } else {
            let mut next = self.turn;
            loop {
                next = (next + 1) % MAX_PLAYERS;
                if self.bidders[next] {
                    break;
                }
            }
            self.set_turn(next);
            Ok(())
        }
    }

    /// The sole surviving bidder takes the lead and the kitty; their team
    /// is committed to the high bid. The lead must bury cards back down to
    /// an even hand before trump is chosen.
    fn end_betting(&mut self, seats: &mut Seats) -> GameResult<()> {
        let lead = self
            .bidders
            .iter()
            .position(|&b| b)
            .ok_or_else(|| GameError::Inconsistency("betting ended with no bidder".into()))?;
        self.lead = lead;
        self.notifier.emit("lead", Mutation::Replace);
        self.bet_team = Some(Team::for_seat(lead));
        self.notifier.emit("bet_team", Mutation::Replace);
        let hand = Self::hand_of(seats, self.seats[lead])?;
        for card in self.kitty.take_all() {
            hand.push_card(card);
        }
        self.notifier.emit("kitty", Mutation::Replace);
        self.pending_discard = true;
        self.notifier.emit("pending_discard", Mutation::Replace);
        self.set_turn(lead);
        self.set_state(TableState::Playing);
        Ok(())
    }

    /// The lead player buries kitty-sized cards into their team's discard
    /// pile, restoring an even hand. Buried points count for the bidding
    /// team at settlement.
    pub fn discard(&mut self, player: PlayerId, cards: &[Card], seats: &mut Seats) -> GameResult<()> {
        if self.state != TableState::Playing {
            return Err(GameError::invalid_state("discard", self.state));
        }
        if !self.pending_discard {
            return Err(GameError::NoDiscardPending);
        }
        let seat = self.seat_of(player)?;
        if seat != self.turn {
            return Err(GameError::OutOfTurn);
        }
        if seat != self.lead {
            return Err(GameError::NotLeadPlayer);
        }
        if cards.len() != KITTY_SIZE {
            return Err(GameError::InvalidDiscard {
                expected: KITTY_SIZE,
                actual: cards.len(),
            });
        }
        let team = self
            .bet_team
            .ok_or_else(|| GameError::Inconsistency("discard without a bid".into()))?;
        let hand = Self::hand_of(seats, player)?;
        for (i, card) in cards.iter().enumerate() {
            // The deck holds no duplicates, so a repeated pick is a card
            // the hand cannot supply twice.
            if !hand.contains(card) || cards[..i].contains(card) {
                return Err(GameError::CardNotHeld(*card));
            }
        }
        let pile = match team {
            Team::A => &mut self.discards_a,
            Team::B => &mut self.discards_b,
        };
        for card in cards {
            let card = hand
                .remove_card(card)
                .map_err(|_| GameError::CardNotHeld(*card))?;
            pile.push_card(card);
        }
        self.pending_discard = false;
        self.notifier.emit("pending_discard", Mutation::Replace);
        self.notifier.emit("discards", Mutation::Replace);
        Ok(())
    }

    /// The lead player names the trump suit after burying the kitty and
    /// before the first card of the round is played.
    pub fn set_trump_suit(&mut self, player: PlayerId, suit: Suit) -> GameResult<()> {
        if self.state != TableState::Playing {
            return Err(GameError::invalid_state("set_trump_suit", self.state));
        }
        if self.pending_discard {
            return Err(GameError::DiscardRequired);
        }
        if self.trump.is_some() {
            return Err(GameError::TrumpAlreadySet);
        }
        let seat = self.seat_of(player)?;
        if seat != self.turn {
            return Err(GameError::OutOfTurn);
        }
        if seat != self.lead {
            return Err(GameError::NotLeadPlayer);
        }
        self.trump = Some(suit);
        self.notifier.emit("trump", Mutation::Replace);
        Ok(())
    }

    /// Play a card from the current player's hand into the trick. When
    /// the fourth card lands the trick is resolved.
    pub fn play_card(&mut self, player: PlayerId, card: Card, seats: &mut Seats) -> GameResult<()> {
        if self.state != TableState::Playing {
            return Err(GameError::invalid_state("play_card", self.state));
        }
        if self.trump.is_none() {
            return Err(GameError::TrumpNotSet);
        }
        let seat = self.seat_of(player)?;
        if seat != self.turn {
            return Err(GameError::OutOfTurn);
        }
        let hand = Self::hand_of(seats, player)?;
        let card = hand
            .remove_card(&card)
            .map_err(|_| GameError::CardNotHeld(card))?;
        self.trick[seat] = Some(card);
        self.notifier.emit("trick", Mutation::Insert { index: seat });
        let next = (self.turn + 1) % MAX_PLAYERS;
        if next == self.lead {
            self.finish_trick(seats)
        } else {
            self.set_turn(next);
            Ok(())
        }
    }

    /// Resolve a complete trick: highest trump wins, otherwise highest
    /// card of the led suit. The winner's team collects the cards and the
    /// winner leads the next trick, or the round ends when hands are out.
    fn finish_trick(&mut self, seats: &mut Seats) -> GameResult<()> {
        let trump = self.trump.ok_or(GameError::TrumpNotSet)?;
        let complete = |seat: usize| {
            self.trick[seat].ok_or_else(|| GameError::Inconsistency("incomplete trick".into()))
        };
        let mut winner = self.lead;
        let mut best = complete(self.lead)?;
        for offset in 1..MAX_PLAYERS {
            let seat = (self.lead + offset) % MAX_PLAYERS;
            let card = complete(seat)?;
            if beats(card, best, trump) {
                winner = seat;
                best = card;
            }
        }
        let pile = match Team::for_seat(winner) {
            Team::A => &mut self.discards_a,
            Team::B => &mut self.discards_b,
        };
        for slot in &mut self.trick {
            if let Some(card) = slot.take() {
                pile.push_card(card);
            }
        }
        self.notifier.emit("trick", Mutation::Replace);
        self.notifier.emit("discards", Mutation::Replace);
        let winner_hand_empty = Self::hand_of(seats, self.seats[winner])?.is_empty();
        if winner_hand_empty {
            self.set_state(TableState::End);
        } else {
            self.lead = winner;
            self.notifier.emit("lead", Mutation::Replace);
            self.set_turn(winner);
        }
        Ok(())
    }

    /// Suspend turn-taking, remembering where to pick back up.
    pub fn pause(&mut self) -> GameResult<()> {
        match self.state {
            TableState::Betting | TableState::Playing => {
                self.prev_state = Some(self.state);
                self.set_state(TableState::Paused);
                Ok(())
            }
            state => Err(GameError::invalid_state("pause", state)),
        }
    }

    /// Resume from the state recorded by [`Table::pause`].
    pub fn resume(&mut self) -> GameResult<()> {
        if self.state != TableState::Paused {
            return Err(GameError::NoPausedState);
        }
        let prev = self
            .prev_state
            .take()
            .ok_or(GameError::NoPausedState)?;
        self.set_state(prev);
        Ok(())
    }

    /// Start the next round: reclaim the discard piles into the deck,
    /// rotate the lead seat and deal again.
    pub fn restart(&mut self, seats: &mut Seats) -> GameResult<()> {
        if self.state != TableState::End {
            return Err(GameError::invalid_state("restart", self.state));
        }
        self.round += 1;
        self.notifier.emit("round", Mutation::Replace);
        self.lead = self.round as usize % MAX_PLAYERS;
        self.notifier.emit("lead", Mutation::Replace);
        self.deck
            .rebuild([&mut self.discards_a, &mut self.discards_b]);
        self.notifier.emit("discards", Mutation::Replace);
        self.bet_amount = 0;
        self.bet_team = None;
        self.trump = None;
        self.pending_discard = false;
        self.notifier.emit("bet_amount", Mutation::Replace);
        self.notifier.emit("bet_team", Mutation::Replace);
        self.notifier.emit("trump", Mutation::Replace);
        self.state = TableState::Created;
        self.setup(seats)
    }
}

/// Whether `candidate` beats the current `best` card of a trick. Within a
/// suit the higher rank wins; across suits only trump wins. `best` starts
/// as the led card, so an off-suit non-trump card can never take over.
fn beats(candidate: Card, best: Card, trump: Suit) -> bool {
    if candidate.suit == best.suit {
        candidate.rank > best.rank
    } else {
        candidate.suit == trump
    }
}
