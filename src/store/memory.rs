//! In-memory [`ObjectStore`] backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::ObjectStore;

/// Process-local document store. Concurrent-safe; contents are lost on
/// shutdown.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<(&'static str, Uuid), Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in one collection.
    pub async fn count(&self, kind: &'static str) -> usize {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, kind: &'static str, id: Uuid) -> StoreResult<Value> {
        self.documents
            .read()
            .await
            .get(&(kind, id))
            .cloned()
            .ok_or(StoreError::NotFound { kind, id })
    }

    async fn save(&self, kind: &'static str, id: Uuid, doc: Value) -> StoreResult<()> {
        self.documents.write().await.insert((kind, id), doc);
        Ok(())
    }

    async fn delete(&self, kind: &'static str, id: Uuid) -> StoreResult<()> {
        self.documents
            .write()
            .await
            .remove(&(kind, id))
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind, id })
    }

    async fn find(
        &self,
        kind: &'static str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Option<Value>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .find(|((k, _), doc)| *k == kind && doc.get(field) == Some(value))
            .map(|(_, doc)| doc.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GAMES;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_get_delete_round_trip() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        store.save(GAMES, id, json!({"round": 1})).await.unwrap();
        assert!(store.exists(GAMES, id).await.unwrap());
        assert_eq!(store.get(GAMES, id).await.unwrap(), json!({"round": 1}));

        // Saving again overwrites.
        store.save(GAMES, id, json!({"round": 2})).await.unwrap();
        assert_eq!(store.get(GAMES, id).await.unwrap(), json!({"round": 2}));

        store.delete(GAMES, id).await.unwrap();
        assert!(!store.exists(GAMES, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_documents_report_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        assert!(matches!(
            store.get(GAMES, id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(GAMES, id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_matches_on_a_top_level_field() {
        let store = MemoryStore::new();
        let users = crate::store::USERS;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store
            .save(users, alice, json!({"username": "alice", "wins": 3}))
            .await
            .unwrap();
        store
            .save(users, bob, json!({"username": "bob", "wins": 0}))
            .await
            .unwrap();

        let found = store
            .find(users, "username", &json!("bob"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, json!({"username": "bob", "wins": 0}));

        // No match, and no bleed across collections.
        assert_eq!(
            store.find(users, "username", &json!("carol")).await.unwrap(),
            None
        );
        assert_eq!(
            store.find(GAMES, "username", &json!("alice")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_collections_are_disjoint() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.save(GAMES, id, json!({})).await.unwrap();

        assert!(!store.exists(crate::store::USERS, id).await.unwrap());
        assert_eq!(store.count(GAMES).await, 1);
        assert_eq!(store.count(crate::store::USERS).await, 0);
    }
}
