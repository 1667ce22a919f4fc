use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use tinylink_core::store::{LinkStore, ReadLinkStore, Result};
use tinylink_core::{Link, ShortCode, StorageError};

/// In-memory implementation of the link store using DashMap.
///
/// DashMap shards its locks, so operations on different codes rarely block
/// each other. `create` goes through the entry API and `increment_hit`
/// through a write guard, which keeps both atomic per code.
///
/// Nothing is persisted; the store is empty after a restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    storage: DashMap<String, Link>,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl ReadLinkStore for InMemoryStore {
    async fn get(&self, code: &ShortCode) -> Result<Option<Link>> {
        Ok(self.storage.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn list(&self) -> Result<Vec<Link>> {
        Ok(self
            .storage
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[async_trait]
impl LinkStore for InMemoryStore {
    async fn create(&self, link: Link) -> Result<()> {
        match self.storage.entry(link.code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(link.code.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(link);
                Ok(())
            }
        }
    }

    async fn increment_hit(&self, code: &ShortCode, at: Timestamp) -> Result<Link> {
        let mut entry = self
            .storage
            .get_mut(code.as_str())
            .ok_or_else(|| StorageError::NotFound(code.to_string()))?;

        entry.record_hit(at);
        Ok(entry.clone())
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        self.storage
            .remove(code.as_str())
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn link(c: &str, url: &str) -> Link {
        Link::new(code(c), url, Timestamp::from_second(1_700_000_000).unwrap())
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = InMemoryStore::new();

        store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap();

        let result = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.long_url, "https://example.com");
        assert_eq!(result.hit_count, 0);
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let store = InMemoryStore::new();

        assert!(store.get(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_conflict_keeps_first_record() {
        let store = InMemoryStore::new();

        store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap();
        let err = store
            .create(link("abc123", "https://other.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
        let result = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.long_url, "https://example.com");
    }

    #[tokio::test]
    async fn increment_hit_updates_record() {
        let store = InMemoryStore::new();
        let at = Timestamp::from_second(1_700_000_100).unwrap();

        store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap();
        let updated = store
            .increment_hit(&code("abc123"), at)
            .await
            .unwrap();

        assert_eq!(updated.hit_count, 1);
        assert_eq!(updated.last_access_at, Some(at));
        assert_eq!(store.get(&code("abc123")).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn delete_existing_and_missing() {
        let store = InMemoryStore::new();

        store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap();
        store.delete(&code("abc123")).await.unwrap();

        assert!(store.is_empty());
        assert!(matches!(
            store.delete(&code("abc123")).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }
}
