//! End-to-end round and game flow through the public `Game` API.

use proptest::prelude::*;
use two_hundred::UserId;
use two_hundred::game::{
    Card, DeckVariant, Game, GameError, GameOptions, GameState, Suit, TableState, Team,
};
use two_hundred::users::User;

fn seated_game(options: GameOptions) -> (Vec<UserId>, Game) {
    let users: Vec<User> = ["north", "east", "south", "west"]
        .iter()
        .map(|name| User::new(*name, *name))
        .collect();
    let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
    let mut game = Game::new(users[0].clone(), options);
    for (slot, user) in users.into_iter().enumerate().skip(1) {
        game.add_player(user, slot).unwrap();
    }
    game.start_game().unwrap();
    (ids, game)
}

fn user_at(game: &Game, seat: usize) -> UserId {
    game.players()[seat].as_ref().unwrap().user.id
}

/// Bury the kitty-sized surplus from the winning bidder's hand.
fn bury_surplus(game: &mut Game) -> UserId {
    let seat = game.table().unwrap().lead_seat();
    let lead = user_at(game, seat);
    let picks: Vec<Card> = game.players()[seat].as_ref().unwrap().hand.cards()[..4].to_vec();
    game.discard(lead, &picks).unwrap();
    lead
}

fn total_cards(game: &Game) -> usize {
    let table = game.table().unwrap();
    let hands: usize = game
        .players()
        .iter()
        .flatten()
        .map(|p| p.hand.len())
        .sum();
    hands
        + table.deck_len()
        + table.kitty().len()
        + table.trick().iter().flatten().count()
        + table.discards(Team::A).len()
        + table.discards(Team::B).len()
}

#[test]
fn test_full_deal_covers_the_deck() {
    let (_, game) = seated_game(GameOptions::default());
    let table = game.table().unwrap();

    assert_eq!(table.state(), TableState::Betting);
    assert_eq!(table.kitty().len(), 4);
    for seat in game.players().iter().flatten() {
        assert_eq!(seat.hand.len(), 8);
    }
    assert_eq!(total_cards(&game), DeckVariant::Original.size());
}

#[test]
fn test_sixes_deal_gives_nine_card_hands() {
    let (_, game) = seated_game(GameOptions {
        sixes: true,
        ..GameOptions::default()
    });
    for seat in game.players().iter().flatten() {
        assert_eq!(seat.hand.len(), 9);
    }
    assert_eq!(total_cards(&game), DeckVariant::Sixes.size());
}

#[test]
fn test_scripted_bidding_war() {
    let (ids, mut game) = seated_game(GameOptions::default());

    // Bidding opens at seat 1 and rotates, skipping seats that passed.
    game.bet(ids[1], 50).unwrap();
    game.bet(ids[2], 0).unwrap();
    game.bet(ids[3], 55).unwrap();
    game.bet(ids[0], 60).unwrap();
    game.bet(ids[1], 0).unwrap();
    game.bet(ids[3], 65).unwrap();
    game.bet(ids[0], 0).unwrap();

    let table = game.table().unwrap();
    assert_eq!(table.state(), TableState::Playing);
    assert_eq!(table.lead_seat(), 3);
    assert_eq!(table.bet_amount(), 65);
    assert_eq!(table.bet_team(), Some(Team::B));
    // Kitty went to the winning bidder.
    assert_eq!(game.players()[3].as_ref().unwrap().hand.len(), 12);
    assert_eq!(total_cards(&game), DeckVariant::Original.size());
}

#[test]
fn test_round_trip_through_a_full_game() {
    let (_, mut game) = seated_game(GameOptions {
        win_amount: 1,
        ..GameOptions::default()
    });

    // Everyone passes; the survivor holds a zero bid they trivially make.
    while game.table().unwrap().state() == TableState::Betting {
        let uid = user_at(&game, game.table().unwrap().turn_seat());
        game.bet(uid, 0).unwrap();
    }
    let lead = bury_surplus(&mut game);
    game.set_trump_suit(lead, Suit::Hearts).unwrap();

    while game
        .table()
        .is_some_and(|t| t.state() == TableState::Playing)
    {
        assert_eq!(total_cards(&game), DeckVariant::Original.size());
        let seat = game.table().unwrap().turn_seat();
        let uid = user_at(&game, seat);
        let card = game.players()[seat].as_ref().unwrap().hand.cards()[0];

        // Only the turn player may act.
        let next = (seat + 1) % 4;
        let other_hand = &game.players()[next].as_ref().unwrap().hand;
        if !other_hand.is_empty() {
            let other_card = other_hand.cards()[0];
            let other = user_at(&game, next);
            assert_eq!(
                game.play_card(other, other_card),
                Err(GameError::OutOfTurn)
            );
        }

        game.play_card(uid, card).unwrap();
    }

    assert_eq!(game.state(), GameState::End);
    let winner = game.winner().unwrap();
    assert!(game.points().get(winner) >= 1);
    assert_eq!(
        game.points().a + game.points().b,
        100,
        "a made zero bid banks both piles"
    );
}

#[test]
fn test_mid_round_disconnect_and_takeover() {
    let (ids, mut game) = seated_game(GameOptions::default());
    game.bet(ids[1], 50).unwrap();

    game.remove_player_by_user_id(ids[3]).unwrap();
    assert_eq!(game.state(), GameState::Paused);
    assert!(matches!(
        game.bet(ids[2], 55),
        Err(GameError::InvalidState { .. })
    ));

    let replacement = User::new("sub", "Sub");
    game.add_player(replacement, 3).unwrap();
    assert_eq!(game.state(), GameState::Running);

    // Betting picks up exactly where it stopped.
    assert_eq!(game.table().unwrap().turn_seat(), 2);
    assert_eq!(game.table().unwrap().bet_amount(), 50);
    game.bet(ids[2], 55).unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// No card is created or destroyed anywhere in a round, whatever
    /// cards get played.
    #[test]
    fn prop_card_conservation_over_random_play(choices in prop::collection::vec(0usize..16, 64)) {
        let (_, mut game) = seated_game(GameOptions::default());
        while game.table().unwrap().state() == TableState::Betting {
            let uid = user_at(&game, game.table().unwrap().turn_seat());
            game.bet(uid, 0).unwrap();
        }
        let lead = bury_surplus(&mut game);
        game.set_trump_suit(lead, Suit::Spades).unwrap();

        for &choice in &choices {
            let Some(table) = game.table() else { break };
            if table.state() != TableState::Playing {
                break;
            }
            let seat = table.turn_seat();
            let uid = user_at(&game, seat);
            let hand = &game.players()[seat].as_ref().unwrap().hand;
            let card = hand.cards()[choice % hand.len()];
            game.play_card(uid, card).unwrap();
            prop_assert_eq!(total_cards(&game), DeckVariant::Original.size());
        }
    }
}
