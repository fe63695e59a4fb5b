//! Room manager: registry of live rooms over the object store.
//!
//! The manager keeps a bounded, insertion-ordered set of live rooms. A
//! command addressed to a game that is not live restores it lazily from its
//! persisted document; when the live set overflows, the oldest room is
//! closed (which checkpoints it) to make space.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use super::actor::{RoomActor, RoomHandle};
use super::messages::{RoomNotification, RoomSummary};
use crate::game::{Card, Game, GameError, GameOptions, GameResult, Suit};
use crate::store::{GAMES, ObjectStore};
use crate::users::User;
use crate::{GameId, UserId};

/// Live rooms kept resident before the oldest gets checkpointed out.
pub const DEFAULT_MAX_LIVE_ROOMS: usize = 100;

pub struct RoomManager {
    store: Arc<dyn ObjectStore>,
    rooms: RwLock<HashMap<GameId, RoomHandle>>,
    /// Live room ids, oldest first.
    order: RwLock<VecDeque<GameId>>,
    max_live: usize,
}

impl RoomManager {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_capacity(store, DEFAULT_MAX_LIVE_ROOMS)
    }

    #[must_use]
    pub fn with_capacity(store: Arc<dyn ObjectStore>, max_live: usize) -> Self {
        Self {
            store,
            rooms: RwLock::new(HashMap::new()),
            order: RwLock::new(VecDeque::new()),
            max_live,
        }
    }

    /// Create a game with the creating user at slot 0, persist its initial
    /// document and spawn its room.
    pub async fn create_room(
        &self,
        creator: User,
        options: GameOptions,
    ) -> GameResult<GameId> {
        let game = Game::new(creator, options);
        let id = game.id();
        let doc = game
            .snapshot()
            .map_err(|e| GameError::Storage(e.to_string()))?;
        self.store
            .save(GAMES, id, doc)
            .await
            .map_err(|e| GameError::Storage(e.to_string()))?;
        self.register(game).await;
        log::info!("created room {id}");
        Ok(id)
    }

    /// Handle for a game's room, restoring the game from the store when it
    /// is not live.
    pub async fn room(&self, game_id: GameId) -> GameResult<RoomHandle> {
        if let Some(handle) = self.rooms.read().await.get(&game_id).cloned() {
            return Ok(handle);
        }
        let doc = self.store.get(GAMES, game_id).await.map_err(|err| {
            if err.is_not_found() {
                GameError::GameNotFound(game_id)
            } else {
                GameError::Storage(err.to_string())
            }
        })?;
        let game = Game::restore(doc).map_err(|e| GameError::Storage(e.to_string()))?;
        log::info!("restored room {game_id} from store");
        Ok(self.register(game).await)
    }

    /// Insert a room into the live set, evicting the oldest room when the
    /// set overflows. A concurrent restore of the same game yields the
    /// handle that won the race.
    async fn register(&self, game: Game) -> RoomHandle {
        let id = game.id();
        let (actor, handle) = RoomActor::new(game, Arc::clone(&self.store));
        let mut fresh_actor = None;
        let (handle, evicted) = {
            let mut rooms = self.rooms.write().await;
            if let Some(existing) = rooms.get(&id) {
                (existing.clone(), None)
            } else {
                let mut order = self.order.write().await;
                rooms.insert(id, handle.clone());
                order.push_back(id);
                let evicted = if order.len() > self.max_live {
                    order.pop_front().and_then(|old| rooms.remove(&old))
                } else {
                    None
                };
                fresh_actor = Some(actor);
                (handle, evicted)
            }
        };
        if let Some(actor) = fresh_actor {
            tokio::spawn(actor.run());
        }
        if let Some(old) = evicted {
            let old_id = old.game_id();
            if let Err(err) = old.close().await {
                log::warn!("evicting room {old_id} failed: {err}");
            } else {
                log::info!("evicted room {old_id} to make space");
            }
        }
        handle
    }

    /// Stop a live room after checkpointing it. The persisted game stays
    /// available for lazy restore. A no-op when the room is not live.
    pub async fn close_room(&self, game_id: GameId) -> GameResult<()> {
        let handle = {
            let mut rooms = self.rooms.write().await;
            let mut order = self.order.write().await;
            order.retain(|id| *id != game_id);
            rooms.remove(&game_id)
        };
        match handle {
            Some(handle) => handle.close().await,
            None => Ok(()),
        }
    }

    /// Close the room and delete the persisted game document, seats,
    /// spectators and table included.
    pub async fn delete_room(&self, game_id: GameId) -> GameResult<()> {
        self.close_room(game_id).await?;
        match self.store.delete(GAMES, game_id).await {
            Ok(()) => {
                log::info!("deleted room {game_id}");
                Ok(())
            }
            Err(err) if err.is_not_found() => Err(GameError::GameNotFound(game_id)),
            Err(err) => Err(GameError::Storage(err.to_string())),
        }
    }

    pub async fn live_rooms(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn add_player(&self, game_id: GameId, user: User, slot: usize) -> GameResult<()> {
        self.room(game_id).await?.add_player(user, slot).await
    }

    pub async fn remove_player(&self, game_id: GameId, user_id: UserId) -> GameResult<()> {
        self.room(game_id).await?.remove_player(user_id).await
    }

    pub async fn add_spectator(&self, game_id: GameId, user: User) -> GameResult<()> {
        self.room(game_id).await?.add_spectator(user).await
    }

    pub async fn remove_spectator(&self, game_id: GameId, user_id: UserId) -> GameResult<()> {
        self.room(game_id).await?.remove_spectator(user_id).await
    }

    pub async fn start_game(&self, game_id: GameId) -> GameResult<()> {
        self.room(game_id).await?.start_game().await
    }

    pub async fn bet(&self, game_id: GameId, user_id: UserId, amount: u32) -> GameResult<()> {
        self.room(game_id).await?.bet(user_id, amount).await
    }

    pub async fn discard(
        &self,
        game_id: GameId,
        user_id: UserId,
        cards: Vec<Card>,
    ) -> GameResult<()> {
        self.room(game_id).await?.discard(user_id, cards).await
    }

    pub async fn set_trump_suit(
        &self,
        game_id: GameId,
        user_id: UserId,
        suit: Suit,
    ) -> GameResult<()> {
        self.room(game_id).await?.set_trump_suit(user_id, suit).await
    }

    pub async fn play_card(&self, game_id: GameId, user_id: UserId, card: Card) -> GameResult<()> {
        self.room(game_id).await?.play_card(user_id, card).await
    }

    pub async fn summary(&self, game_id: GameId) -> GameResult<RoomSummary> {
        self.room(game_id).await?.summary().await
    }

    pub async fn subscribe(
        &self,
        game_id: GameId,
        user_id: UserId,
        sender: mpsc::Sender<RoomNotification>,
    ) -> GameResult<()> {
        self.room(game_id).await?.subscribe(user_id, sender).await
    }

    pub async fn unsubscribe(&self, game_id: GameId, user_id: UserId) -> GameResult<()> {
        self.room(game_id).await?.unsubscribe(user_id).await
    }
}
