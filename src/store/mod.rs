//! Durable object storage for game documents.
//!
//! The engine persists whole entities as JSON documents at explicit
//! checkpoints (creation, disconnect, room close), never per mutation.
//! [`ObjectStore`] is the only seam the rest of the crate talks to; the
//! in-memory implementation backs tests and single-process deployments,
//! and a document database can implement the same trait.

pub mod errors;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Document collection for games.
pub const GAMES: &str = "games";

/// Document collection for users.
pub const USERS: &str = "users";

/// Async document store keyed by collection name and id.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a document. Fails with [`StoreError::NotFound`] when absent.
    async fn get(&self, kind: &'static str, id: Uuid) -> StoreResult<Value>;

    /// Insert or overwrite a document.
    async fn save(&self, kind: &'static str, id: Uuid, doc: Value) -> StoreResult<()>;

    /// Remove a document. Fails with [`StoreError::NotFound`] when absent.
    async fn delete(&self, kind: &'static str, id: Uuid) -> StoreResult<()>;

    /// First document in `kind` whose top-level `field` equals `value`,
    /// or `None` when no document matches. Used for lookups by secondary
    /// attributes such as a username.
    async fn find(
        &self,
        kind: &'static str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Option<Value>>;

    /// Whether a document exists.
    async fn exists(&self, kind: &'static str, id: Uuid) -> StoreResult<bool> {
        match self.get(kind, id).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
