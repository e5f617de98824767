use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::session::types::SessionRecord;

pub type SessionUpdate = Box<dyn FnOnce(&mut SessionRecord) + Send>;

/// Keyed session storage. `update` must apply each closure atomically per key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<SessionRecord>;
    async fn put(&self, record: SessionRecord);
    async fn delete(&self, id: &str) -> bool;
    /// Apply `apply` to the stored record and return the updated copy, or `None` if absent.
    async fn update(&self, id: &str, apply: SessionUpdate) -> Option<SessionRecord>;
}

/// Process-lifetime store. Each record has its own lock, so updates to one
/// session never wait on another.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, Arc<Mutex<SessionRecord>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn entry(&self, id: &str) -> Option<Arc<Mutex<SessionRecord>>> {
        self.entries.read().await.get(id).cloned()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Option<SessionRecord> {
        let entry = self.entry(id).await?;
        let record = entry.lock().await;
        Some(record.clone())
    }

    async fn put(&self, record: SessionRecord) {
        let id = record.id.clone();
        self.entries
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(record)));
    }

    async fn delete(&self, id: &str) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    async fn update(&self, id: &str, apply: SessionUpdate) -> Option<SessionRecord> {
        let entry = self.entry(id).await?;
        let mut record = entry.lock().await;
        apply(&mut record);
        Some(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemorySessionStore::new();
        let record = SessionRecord::new("Accountant", "Retail", "journal entry", Vec::new());
        let id = record.id.clone();
        store.put(record.clone()).await;
        assert_eq!(store.get(&id).await, Some(record));
        assert!(store.delete(&id).await);
        assert!(!store.delete(&id).await);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn update_on_missing_key_is_none() {
        let store = InMemorySessionStore::new();
        let out = store.update("nope", Box::new(|r: &mut SessionRecord| r.steps_completed = 5)).await;
        assert!(out.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let store = Arc::new(InMemorySessionStore::new());
        let record = SessionRecord::new("Stock Manager", "Retail", "material request", Vec::new());
        let id = record.id.clone();
        store.put(record).await;

        let mut handles = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        &id,
                        Box::new(move |r: &mut SessionRecord| {
                            r.steps_completed += 1;
                            r.mistakes_made.push(format!("m{i}"));
                        }),
                    )
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.steps_completed, 50);
        assert_eq!(record.mistakes_made.len(), 50);
    }
}
