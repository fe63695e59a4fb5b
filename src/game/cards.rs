//! Cards, ordered card collections and the deck.
//!
//! A [`CardHolder`] is the single collection primitive shared by hands, the
//! kitty and the discard piles: it keeps cards in the order dictated by its
//! optional [`SortStrategy`] and publishes every mutation on its notifier.
//! [`Deck`] wraps a holder with a fixed composition per [`DeckVariant`].

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::errors::{GameError, GameResult};
use crate::notify::{Mutation, Notifier};

/// Suits in ascending order of sort precedence.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Diamonds,
    Clubs,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Diamonds, Suit::Clubs, Suit::Hearts, Suit::Spades];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        };
        write!(f, "{symbol}")
    }
}

/// Ranks in ascending order. Ranks below Five (and the `Joker`) exist for
/// completeness but are not part of either deck variant.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Joker,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rank::Joker => "Joker",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        };
        write!(f, "{label}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    #[must_use]
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    /// Card points this card is worth in a discard pile.
    #[must_use]
    pub fn points(&self) -> u32 {
        match self.rank {
            Rank::Five => 5,
            Rank::Ten | Rank::Ace => 10,
            _ => 0,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// Ordering applied by a [`CardHolder`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortStrategy {
    /// Group by suit, then by rank within the suit.
    Suit,
    /// Order by rank alone, suits breaking ties.
    Value,
}

impl SortStrategy {
    fn compare(self, a: &Card, b: &Card) -> CmpOrdering {
        match self {
            SortStrategy::Suit => (a.suit, a.rank).cmp(&(b.suit, b.rank)),
            SortStrategy::Value => (a.rank, a.suit).cmp(&(b.rank, b.suit)),
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortStrategy::Suit => write!(f, "suit"),
            SortStrategy::Value => write!(f, "value"),
        }
    }
}

impl FromStr for SortStrategy {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suit" => Ok(SortStrategy::Suit),
            "value" => Ok(SortStrategy::Value),
            other => Err(GameError::UnknownSortStrategy(other.to_string())),
        }
    }
}

/// An ordered collection of cards with optional automatic sorting.
#[derive(Debug, Deserialize, Serialize)]
pub struct CardHolder {
    cards: Vec<Card>,
    sort: Option<SortStrategy>,
    ascending: bool,
    #[serde(skip)]
    notifier: Notifier,
}

impl CardHolder {
    #[must_use]
    pub fn new(sort: Option<SortStrategy>, ascending: bool) -> Self {
        Self {
            cards: Vec::new(),
            sort,
            ascending,
            notifier: Notifier::new(),
        }
    }

    #[must_use]
    pub fn with_cards(cards: Vec<Card>, sort: Option<SortStrategy>, ascending: bool) -> Self {
        let mut holder = Self {
            cards,
            sort,
            ascending,
            notifier: Notifier::new(),
        };
        if let Some(strategy) = holder.sort {
            holder.sort_with(strategy);
        }
        holder
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    /// Total card points held, capped only by deck composition.
    #[must_use]
    pub fn points(&self) -> u32 {
        self.cards.iter().map(Card::points).sum()
    }

    fn compare(&self, a: &Card, b: &Card) -> CmpOrdering {
        match self.sort {
            Some(strategy) => {
                let ordering = strategy.compare(a, b);
                if self.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
            None => CmpOrdering::Equal,
        }
    }

    fn sort_with(&mut self, strategy: SortStrategy) {
        let ascending = self.ascending;
        self.cards.sort_by(|a, b| {
            let ordering = strategy.compare(a, b);
            if ascending { ordering } else { ordering.reverse() }
        });
    }

    /// Construct a card and insert it at its sorted position (or at the
    /// end when unsorted). Returns the insertion index.
    pub fn add_card(&mut self, suit: Suit, rank: Rank) -> usize {
        self.push_card(Card::new(suit, rank))
    }

    /// Insert an existing card at its sorted position (or at the end when
    /// unsorted). Returns the insertion index.
    pub fn push_card(&mut self, card: Card) -> usize {
        let index = match self.sort {
            Some(_) => self
                .cards
                .partition_point(|held| self.compare(held, &card) != CmpOrdering::Greater),
            None => self.cards.len(),
        };
        self.cards.insert(index, card);
        let mutation = if index == self.cards.len() - 1 {
            Mutation::Append
        } else {
            Mutation::Insert { index }
        };
        self.notifier.emit("cards", mutation);
        index
    }

    /// Remove a specific card. Fails with a not-found error when the card
    /// is not held.
    pub fn remove_card(&mut self, card: &Card) -> GameResult<Card> {
        let index = self
            .cards
            .iter()
            .position(|held| held == card)
            .ok_or(GameError::CardNotFound(*card))?;
        let removed = self.cards.remove(index);
        self.notifier.emit("cards", Mutation::Remove { index });
        Ok(removed)
    }

    /// Take the top card. Fails when the holder is empty.
    pub fn deal_card(&mut self) -> GameResult<Card> {
        if self.cards.is_empty() {
            return Err(GameError::NotEnoughCards {
                requested: 1,
                available: 0,
            });
        }
        let index = self.cards.len() - 1;
        let card = self.cards.remove(index);
        self.notifier.emit("cards", Mutation::Remove { index });
        Ok(card)
    }

    /// Take `count` cards from the top. All-or-nothing: fails without
    /// removing anything when fewer than `count` remain.
    pub fn deal_cards(&mut self, count: usize) -> GameResult<Vec<Card>> {
        if self.cards.len() < count {
            return Err(GameError::NotEnoughCards {
                requested: count,
                available: self.cards.len(),
            });
        }
        let cards = self.cards.split_off(self.cards.len() - count);
        self.notifier.emit("cards", Mutation::Replace);
        Ok(cards)
    }

    /// Drain every card out of the holder, preserving order.
    pub fn take_all(&mut self) -> Vec<Card> {
        let cards = std::mem::take(&mut self.cards);
        if !cards.is_empty() {
            self.notifier.emit("cards", Mutation::Replace);
        }
        cards
    }

    /// Re-order in place using the configured strategy.
    pub fn sort(&mut self) -> GameResult<()> {
        let strategy = self.sort.ok_or(GameError::NoSortStrategy)?;
        self.sort_with(strategy);
        self.notifier.emit("cards", Mutation::Replace);
        Ok(())
    }

    /// Change the sort configuration and re-order. Fails when the change
    /// would leave the holder without a strategy.
    pub fn change_sort(
        &mut self,
        strategy: Option<SortStrategy>,
        ascending: Option<bool>,
    ) -> GameResult<()> {
        if strategy.or(self.sort).is_none() {
            return Err(GameError::NoSortStrategy);
        }
        if let Some(ascending) = ascending {
            self.ascending = ascending;
        }
        if strategy.is_some() {
            self.sort = strategy;
        }
        self.sort()
    }

    /// Fisher-Yates shuffle, discarding any sort order.
    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
        self.notifier.emit("cards", Mutation::Replace);
    }
}

/// Deck composition variants of Two-Hundred.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckVariant {
    /// 36 cards: Five through Ace minus the Sixes.
    Original,
    /// 40 cards: Five through Ace.
    Sixes,
}

impl DeckVariant {
    fn ranks(self) -> &'static [Rank] {
        match self {
            DeckVariant::Original => &[
                Rank::Five,
                Rank::Seven,
                Rank::Eight,
                Rank::Nine,
                Rank::Ten,
                Rank::Jack,
                Rank::Queen,
                Rank::King,
                Rank::Ace,
            ],
            DeckVariant::Sixes => &[
                Rank::Five,
                Rank::Six,
                Rank::Seven,
                Rank::Eight,
                Rank::Nine,
                Rank::Ten,
                Rank::Jack,
                Rank::Queen,
                Rank::King,
                Rank::Ace,
            ],
        }
    }

    /// Total cards in this variant.
    #[must_use]
    pub fn size(self) -> usize {
        self.ranks().len() * Suit::ALL.len()
    }
}

/// A full shuffled deck of one [`DeckVariant`].
#[derive(Debug, Deserialize, Serialize)]
pub struct Deck {
    holder: CardHolder,
    variant: DeckVariant,
}

impl Deck {
    /// Build the variant's full composition and shuffle it.
    #[must_use]
    pub fn new(variant: DeckVariant) -> Self {
        let cards = variant
            .ranks()
            .iter()
            .flat_map(|&rank| Suit::ALL.into_iter().map(move |suit| Card::new(suit, rank)))
            .collect();
        let mut deck = Self {
            holder: CardHolder::with_cards(cards, None, true),
            variant,
        };
        deck.holder.shuffle();
        deck
    }

    #[must_use]
    pub fn variant(&self) -> DeckVariant {
        self.variant
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.holder.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holder.is_empty()
    }

    pub fn deal_card(&mut self) -> GameResult<Card> {
        self.holder.deal_card()
    }

    pub fn deal_cards(&mut self, count: usize) -> GameResult<Vec<Card>> {
        self.holder.deal_cards(count)
    }

    pub fn shuffle(&mut self) {
        self.holder.shuffle();
    }

    /// Reclaim cards from other holders back into the deck without
    /// shuffling. Used between rounds to rebuild from the discard piles.
    pub fn rebuild<'a>(&mut self, holders: impl IntoIterator<Item = &'a mut CardHolder>) {
        for holder in holders {
            for card in holder.take_all() {
                self.holder.push_card(card);
            }
        }
    }
}
