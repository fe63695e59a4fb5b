//! Room actor: one task owning one live game.
//!
//! All commands for a game flow through its room's mpsc inbox and are
//! applied strictly in arrival order, so the game itself needs no locking.
//! Change events emitted by the game during a command are forwarded to
//! subscribers after the command completes; persistence happens at explicit
//! checkpoints (player removal and close), not per mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::messages::{RoomMessage, RoomNotification, RoomResponse, RoomSummary};
use crate::game::{Card, Game, GameError, GameResult, Suit};
use crate::notify::{ChangeEvent, WILDCARD};
use crate::store::{GAMES, ObjectStore};
use crate::users::User;
use crate::{GameId, UserId};

const INBOX_CAPACITY: usize = 64;

/// Cloneable handle for sending commands to a room.
#[derive(Clone)]
pub struct RoomHandle {
    game_id: GameId,
    sender: mpsc::Sender<RoomMessage>,
}

impl RoomHandle {
    #[must_use]
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    async fn command<F>(&self, build: F) -> GameResult<()>
    where
        F: FnOnce(oneshot::Sender<RoomResponse>) -> RoomMessage,
    {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| GameError::RoomClosed)?;
        rx.await.map_err(|_| GameError::RoomClosed)?.into_result()
    }

    pub async fn add_player(&self, user: User, slot: usize) -> GameResult<()> {
        self.command(|response| RoomMessage::AddPlayer {
            user,
            slot,
            response,
        })
        .await
    }

    pub async fn remove_player(&self, user_id: UserId) -> GameResult<()> {
        self.command(|response| RoomMessage::RemovePlayer { user_id, response })
            .await
    }

    pub async fn add_spectator(&self, user: User) -> GameResult<()> {
        self.command(|response| RoomMessage::AddSpectator { user, response })
            .await
    }

    pub async fn remove_spectator(&self, user_id: UserId) -> GameResult<()> {
        self.command(|response| RoomMessage::RemoveSpectator { user_id, response })
            .await
    }

    pub async fn start_game(&self) -> GameResult<()> {
        self.command(|response| RoomMessage::StartGame { response })
            .await
    }

    pub async fn bet(&self, user_id: UserId, amount: u32) -> GameResult<()> {
        self.command(|response| RoomMessage::Bet {
            user_id,
            amount,
            response,
        })
        .await
    }

    pub async fn discard(&self, user_id: UserId, cards: Vec<Card>) -> GameResult<()> {
        self.command(|response| RoomMessage::Discard {
            user_id,
            cards,
            response,
        })
        .await
    }

    pub async fn set_trump_suit(&self, user_id: UserId, suit: Suit) -> GameResult<()> {
        self.command(|response| RoomMessage::SetTrumpSuit {
            user_id,
            suit,
            response,
        })
        .await
    }

    pub async fn play_card(&self, user_id: UserId, card: Card) -> GameResult<()> {
        self.command(|response| RoomMessage::PlayCard {
            user_id,
            card,
            response,
        })
        .await
    }

    pub async fn summary(&self) -> GameResult<RoomSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetSummary { response: tx })
            .await
            .map_err(|_| GameError::RoomClosed)?;
        rx.await.map_err(|_| GameError::RoomClosed)
    }

    pub async fn snapshot(&self) -> GameResult<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetSnapshot { response: tx })
            .await
            .map_err(|_| GameError::RoomClosed)?;
        rx.await.map_err(|_| GameError::RoomClosed)?
    }

    pub async fn subscribe(
        &self,
        user_id: UserId,
        sender: mpsc::Sender<RoomNotification>,
    ) -> GameResult<()> {
        self.sender
            .send(RoomMessage::Subscribe { user_id, sender })
            .await
            .map_err(|_| GameError::RoomClosed)
    }

    pub async fn unsubscribe(&self, user_id: UserId) -> GameResult<()> {
        self.sender
            .send(RoomMessage::Unsubscribe { user_id })
            .await
            .map_err(|_| GameError::RoomClosed)
    }

    /// Checkpoint and stop the room.
    pub async fn close(&self) -> GameResult<()> {
        self.command(|response| RoomMessage::Close { response })
            .await
    }
}

pub struct RoomActor {
    game: Game,
    store: Arc<dyn ObjectStore>,
    inbox: mpsc::Receiver<RoomMessage>,
    /// Events the game emitted while handling the current command.
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    subscribers: HashMap<UserId, mpsc::Sender<RoomNotification>>,
    closed: bool,
}

impl RoomActor {
    /// Wrap a game in an actor. The caller spawns [`RoomActor::run`].
    pub fn new(game: Game, store: Arc<dyn ObjectStore>) -> (RoomActor, RoomHandle) {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        game.notifier().subscribe(WILDCARD, move |event| {
            let _ = event_tx.send(event.clone());
        });
        let game_id = game.id();
        let actor = RoomActor {
            game,
            store,
            inbox: rx,
            events: event_rx,
            subscribers: HashMap::new(),
            closed: false,
        };
        let handle = RoomHandle {
            game_id,
            sender: tx,
        };
        (actor, handle)
    }

    pub async fn run(mut self) {
        log::info!("room {} started", self.game.id());
        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
            self.forward_notifications();
            if self.closed {
                break;
            }
        }
        log::info!("room {} stopped", self.game.id());
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::AddPlayer {
                user,
                slot,
                response,
            } => {
                let result = self.game.add_player(user, slot);
                let _ = response.send(result.into());
            }
            RoomMessage::RemovePlayer { user_id, response } => {
                let result = self.game.remove_player_by_user_id(user_id);
                if result.is_ok() {
                    // A departure checkpoint makes the game restorable even
                    // if the process dies while the room sits paused.
                    self.checkpoint().await;
                }
                let _ = response.send(result.into());
            }
            RoomMessage::AddSpectator { user, response } => {
                let result = self.game.add_spectator(user);
                let _ = response.send(result.into());
            }
            RoomMessage::RemoveSpectator { user_id, response } => {
                let result = self.game.remove_spectator_by_user_id(user_id);
                let _ = response.send(result.into());
            }
            RoomMessage::StartGame { response } => {
                let result = self.game.start_game();
                let _ = response.send(result.into());
            }
            RoomMessage::Bet {
                user_id,
                amount,
                response,
            } => {
                let result = self.game.bet(user_id, amount);
                let _ = response.send(result.into());
            }
            RoomMessage::Discard {
                user_id,
                cards,
                response,
            } => {
                let result = self.game.discard(user_id, &cards);
                let _ = response.send(result.into());
            }
            RoomMessage::SetTrumpSuit {
                user_id,
                suit,
                response,
            } => {
                let result = self.game.set_trump_suit(user_id, suit);
                let _ = response.send(result.into());
            }
            RoomMessage::PlayCard {
                user_id,
                card,
                response,
            } => {
                let result = self.game.play_card(user_id, card);
                let _ = response.send(result.into());
            }
            RoomMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }
            RoomMessage::GetSnapshot { response } => {
                let snapshot = self
                    .game
                    .snapshot()
                    .map_err(|e| GameError::Storage(e.to_string()));
                let _ = response.send(snapshot);
            }
            RoomMessage::Subscribe { user_id, sender } => {
                log::debug!("room {}: user {} subscribed", self.game.id(), user_id);
                self.subscribers.insert(user_id, sender);
            }
            RoomMessage::Unsubscribe { user_id } => {
                self.subscribers.remove(&user_id);
            }
            RoomMessage::Close { response } => {
                self.checkpoint().await;
                self.closed = true;
                let _ = response.send(RoomResponse::Ok);
            }
        }
    }

    fn summary(&self) -> RoomSummary {
        let game = &self.game;
        RoomSummary {
            game_id: game.id(),
            state: game.state(),
            round: game.table().map(|t| t.round()),
            points: game.points(),
            players: game
                .players()
                .iter()
                .map(|seat| seat.as_ref().map(|p| p.user.display_name.clone()))
                .collect(),
            active_players: game.active_players(),
            spectator_count: game.spectators().len(),
        }
    }

    /// Forward events from the last command to subscribers, dropping any
    /// whose channel has closed. Full channels lose the event rather than
    /// block the room.
    fn forward_notifications(&mut self) {
        let game_id = self.game.id();
        while let Ok(event) = self.events.try_recv() {
            let notification = RoomNotification {
                game_id,
                field: event.field,
                mutation: event.mutation,
            };
            self.subscribers.retain(|user_id, sender| {
                match sender.try_send(notification.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        log::warn!("room {game_id}: subscriber {user_id} lagging, dropped event");
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                }
            });
        }
    }

    /// Persist the full game document. Failure is logged; in-memory state
    /// stays authoritative.
    async fn checkpoint(&self) {
        let id = self.game.id();
        match self.game.snapshot() {
            Ok(doc) => {
                if let Err(err) = self.store.save(GAMES, id, doc).await {
                    log::warn!("room {id}: checkpoint failed: {err}");
                }
            }
            Err(err) => log::warn!("room {id}: snapshot failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameOptions, GameState};
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn spawn_room() -> (RoomHandle, Arc<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let creator = User::new("host", "Host");
        let creator_id = creator.id;
        let game = Game::new(creator, GameOptions::default());
        let (actor, handle) = RoomActor::new(game, Arc::clone(&store) as Arc<dyn ObjectStore>);
        tokio::spawn(actor.run());
        (handle, store, creator_id)
    }

    #[tokio::test]
    async fn test_commands_apply_in_order() {
        let (room, _, _) = spawn_room();
        for (slot, name) in [(1, "p1"), (2, "p2"), (3, "p3")] {
            room.add_player(User::new(name, name), slot).await.unwrap();
        }
        let summary = room.summary().await.unwrap();
        assert_eq!(summary.state, GameState::Ready);
        assert_eq!(summary.active_players, 4);

        room.start_game().await.unwrap();
        let summary = room.summary().await.unwrap();
        assert_eq!(summary.state, GameState::Running);
        assert_eq!(summary.round, Some(1));
    }

    #[tokio::test]
    async fn test_rejection_carries_game_error_and_emits_nothing() {
        let (room, _, _) = spawn_room();
        let (tx, mut rx) = mpsc::channel(16);
        room.subscribe(Uuid::new_v4(), tx).await.unwrap();

        let err = room.start_game().await.unwrap_err();
        assert!(matches!(err, GameError::InvalidState { .. }));
        // The failed command produced no notification.
        assert!(rx.try_recv().is_err());

        room.add_player(User::new("p1", "p1"), 1).await.unwrap();
        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.field, "players");
    }

    #[tokio::test]
    async fn test_player_removal_checkpoints_the_game() {
        let (room, store, creator_id) = spawn_room();
        let game_id = room.game_id();
        assert!(!store.exists(GAMES, game_id).await.unwrap());

        room.remove_player(creator_id).await.unwrap();
        let doc = store.get(GAMES, game_id).await.unwrap();
        let restored = Game::restore(doc).unwrap();
        assert_eq!(restored.id(), game_id);
        assert_eq!(restored.active_players(), 0);
    }

    #[tokio::test]
    async fn test_close_checkpoints_and_stops() {
        let (room, store, _) = spawn_room();
        let game_id = room.game_id();

        room.close().await.unwrap();
        assert!(store.exists(GAMES, game_id).await.unwrap());
        assert_eq!(
            room.add_player(User::new("late", "Late"), 1).await,
            Err(GameError::RoomClosed)
        );
    }
}
