//! Pendulum state store.
//!
//! Records live as JSON text under `pendulum:{id}` keys, with an
//! insertion-ordered membership list naming the population. The coordinator
//! and the CRUD surface only see the [`PendulumStore`] trait.

use pendulum_shared::Pendulum;
use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for the pendulum population.
///
/// `update` and `update_all` must apply atomically: either every record they
/// touch is written or none is. The coordinator relies on that to never leave
/// the population split between stopped and running.
pub trait PendulumStore: Send + Sync + 'static {
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Pendulum>, StoreError>> + Send;

    /// Write the record and add its id to the population.
    fn insert(&self, pendulum: Pendulum) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read-modify-write one record. Returns the new value, or None if absent.
    fn update<F>(
        &self,
        id: &str,
        f: F,
    ) -> impl Future<Output = Result<Option<Pendulum>, StoreError>> + Send
    where
        F: FnOnce(&mut Pendulum) + Send;

    /// Read-modify-write every member record. Returns the new values in membership order.
    fn update_all<F>(&self, f: F) -> impl Future<Output = Result<Vec<Pendulum>, StoreError>> + Send
    where
        F: FnMut(&mut Pendulum) + Send;

    /// Delete the record and its membership. Returns whether it existed.
    fn remove(&self, id: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Delete every record. Returns how many were removed.
    fn clear(&self) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Member ids in insertion order.
    fn members(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Snapshot of every member record in membership order. Members whose
    /// record has disappeared are skipped.
    fn load_all(&self) -> impl Future<Output = Result<Vec<Pendulum>, StoreError>> + Send;
}

fn record_key(id: &str) -> String {
    format!("pendulum:{}", id)
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, String>,
    members: Vec<String>,
}

impl Inner {
    fn read(&self, id: &str) -> Result<Option<Pendulum>, StoreError> {
        let key = record_key(id);
        match self.records.get(&key) {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { key, source }),
            None => Ok(None),
        }
    }

    fn encode(pendulum: &Pendulum) -> Result<(String, String), StoreError> {
        let key = record_key(&pendulum.id);
        let json =
            serde_json::to_string(pendulum).map_err(|source| StoreError::Corrupt {
                key: key.clone(),
                source,
            })?;
        Ok((key, json))
    }
}

/// In-process store. Each call holds the lock for its whole read-modify-write,
/// which gives `update_all` its all-or-nothing behaviour.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendulumStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Pendulum>, StoreError> {
        self.inner.read().await.read(id)
    }

    async fn insert(&self, pendulum: Pendulum) -> Result<(), StoreError> {
        let (key, json) = Inner::encode(&pendulum)?;
        let mut inner = self.inner.write().await;
        inner.records.insert(key, json);
        if !inner.members.contains(&pendulum.id) {
            inner.members.push(pendulum.id);
        }
        Ok(())
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<Option<Pendulum>, StoreError>
    where
        F: FnOnce(&mut Pendulum) + Send,
    {
        let mut inner = self.inner.write().await;
        let Some(mut pendulum) = inner.read(id)? else {
            return Ok(None);
        };
        f(&mut pendulum);
        let (key, json) = Inner::encode(&pendulum)?;
        inner.records.insert(key, json);
        Ok(Some(pendulum))
    }

    async fn update_all<F>(&self, mut f: F) -> Result<Vec<Pendulum>, StoreError>
    where
        F: FnMut(&mut Pendulum) + Send,
    {
        let mut inner = self.inner.write().await;

        // Stage every write first so a bad record aborts the batch untouched
        let mut staged = Vec::with_capacity(inner.members.len());
        let mut updated = Vec::with_capacity(inner.members.len());
        for id in &inner.members {
            if let Some(mut pendulum) = inner.read(id)? {
                f(&mut pendulum);
                staged.push(Inner::encode(&pendulum)?);
                updated.push(pendulum);
            }
        }
        for (key, json) in staged {
            inner.records.insert(key, json);
        }
        Ok(updated)
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        inner.members.retain(|member| member != id);
        Ok(inner.records.remove(&record_key(id)).is_some())
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.records.len();
        inner.records.clear();
        inner.members.clear();
        Ok(removed)
    }

    async fn members(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.read().await.members.clone())
    }

    async fn load_all(&self) -> Result<Vec<Pendulum>, StoreError> {
        let inner = self.inner.read().await;
        let mut result = Vec::with_capacity(inner.members.len());
        for id in &inner.members {
            if let Some(pendulum) = inner.read(id)? {
                result.push(pendulum);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pendulum(id: &str, length: f64) -> Pendulum {
        Pendulum {
            id: id.to_string(),
            theta0: 0.3,
            mass: 1.0,
            length,
            triggered_at: 0,
            moving: true,
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = MemoryStore::new();
        store.insert(pendulum("a", 2.0)).await.unwrap();
        let got = store.get("a").await.unwrap().unwrap();
        assert_eq!(got, pendulum("a", 2.0));
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_all_keeps_insertion_order() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store.insert(pendulum(id, 1.0)).await.unwrap();
        }
        let ids: Vec<String> = store
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn reinsert_does_not_duplicate_membership() {
        let store = MemoryStore::new();
        store.insert(pendulum("a", 1.0)).await.unwrap();
        store.insert(pendulum("a", 3.0)).await.unwrap();
        assert_eq!(store.members().await.unwrap(), vec!["a"]);
        assert_eq!(store.get("a").await.unwrap().unwrap().length, 3.0);
    }

    #[tokio::test]
    async fn update_missing_returns_none() {
        let store = MemoryStore::new();
        let result = store.update("nope", |p| p.length = 9.0).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_all_touches_every_member() {
        let store = MemoryStore::new();
        store.insert(pendulum("a", 1.0)).await.unwrap();
        store.insert(pendulum("b", 2.0)).await.unwrap();
        let updated = store.update_all(|p| p.stop()).await.unwrap();
        assert_eq!(updated.len(), 2);
        for p in store.load_all().await.unwrap() {
            assert!(!p.moving);
        }
    }

    #[tokio::test]
    async fn remove_drops_record_and_membership() {
        let store = MemoryStore::new();
        store.insert(pendulum("a", 1.0)).await.unwrap();
        store.insert(pendulum("b", 1.0)).await.unwrap();
        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert_eq!(store.members().await.unwrap(), vec!["b"]);
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_empties_population() {
        let store = MemoryStore::new();
        store.insert(pendulum("a", 1.0)).await.unwrap();
        store.insert(pendulum("b", 1.0)).await.unwrap();
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_record_is_reported() {
        let store = MemoryStore::new();
        {
            let mut inner = store.inner.write().await;
            inner
                .records
                .insert(record_key("bad"), "{not json".to_string());
            inner.members.push("bad".to_string());
        }
        let err = store.get("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "pendulum:bad"));
        assert!(store.load_all().await.is_err());
    }
}
