// Snapshot cache: short-lived look-aside copy of the open project
//
// Never the system of record. Anything unreadable or expired is dropped and
// reported as a miss.

use serde::{Deserialize, Serialize};

use crate::document::ProjectDocument;
use crate::store::SessionStore;
use crate::types::{Result, Timestamp};

const KEY_PREFIX: &str = "draftdesk:project:";

/// Stored form of one cached project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: ProjectDocument,
    pub timestamp: Timestamp,
}

pub struct SnapshotCache<S: SessionStore> {
    store: S,
    ttl_ms: i64,
}

impl<S: SessionStore> SnapshotCache<S> {
    pub fn new(store: S, ttl_ms: i64) -> Self {
        SnapshotCache { store, ttl_ms }
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    /// Cache `document` under `key`. Empty documents and storage failures are
    /// logged and otherwise ignored.
    pub fn set(&self, key: &str, document: &ProjectDocument, now: Timestamp) {
        if document.id.is_empty() || document.content.is_empty() {
            tracing::warn!("cache: refusing to cache project '{}' without content", key);
            return;
        }

        let entry = CacheEntry { data: document.clone(), timestamp: now };
        if let Err(e) = self.write_entry(key, &entry) {
            tracing::warn!("cache: could not store project '{}': {}", key, e);
        }
    }

    fn write_entry(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        self.store.set(&Self::storage_key(key), &json)
    }

    /// Fresh, well-formed cached copy of `key`, if any
    pub fn get(&self, key: &str, now: Timestamp) -> Option<ProjectDocument> {
        let storage_key = Self::storage_key(key);
        let raw = match self.store.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("cache: read of '{}' failed: {}", key, e);
                return None;
            }
        };

        match Self::decode(&raw) {
            Some(entry) if now - entry.timestamp <= self.ttl_ms => {
                let mut document = entry.data;
                document.content.normalize();
                Some(document)
            }
            Some(_) => {
                tracing::debug!("cache: entry for '{}' expired", key);
                self.evict(&storage_key);
                None
            }
            None => {
                tracing::debug!("cache: entry for '{}' malformed", key);
                self.evict(&storage_key);
                None
            }
        }
    }

    fn decode(raw: &str) -> Option<CacheEntry> {
        let entry: CacheEntry = serde_json::from_str(raw).ok()?;
        if entry.data.id.is_empty() || entry.data.content.is_empty() {
            return None;
        }
        Some(entry)
    }

    fn evict(&self, storage_key: &str) {
        if let Err(e) = self.store.remove(storage_key) {
            tracing::debug!("cache: eviction of '{}' failed: {}", storage_key, e);
        }
    }

    /// Drop one project (deleted or renamed)
    pub fn clear(&self, key: &str) {
        self.evict(&Self::storage_key(key));
    }

    /// Drop everything (sign-out)
    pub fn clear_all(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("cache: clear failed: {}", e);
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CACHE_TTL_MS;
    use crate::document::ProjectContent;
    use crate::store::MemoryStore;

    fn document(id: &str) -> ProjectDocument {
        let mut content = ProjectContent {
            premise: "Two sisters inherit a vineyard.".to_string(),
            word_goal: 80_000,
            ..Default::default()
        };
        content.normalize();
        ProjectDocument::new(id, content)
    }

    fn cache() -> SnapshotCache<MemoryStore> {
        SnapshotCache::new(MemoryStore::new(), DEFAULT_CACHE_TTL_MS)
    }

    #[test]
    fn test_set_then_get() {
        let cache = cache();
        let doc = document("p1");
        cache.set("p1", &doc, 1_000);

        assert_eq!(cache.get("p1", 1_001), Some(doc));
    }

    #[test]
    fn test_empty_content_is_not_cached() {
        let cache = cache();
        let empty = ProjectDocument::new("p1", ProjectContent::default());
        cache.set("p1", &empty, 0);

        assert!(cache.store().is_empty());
        assert_eq!(cache.get("p1", 0), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = cache();
        cache.set("p1", &document("p1"), 0);

        assert!(cache.get("p1", DEFAULT_CACHE_TTL_MS).is_some());
        assert_eq!(cache.get("p1", DEFAULT_CACHE_TTL_MS + 1), None);
        assert!(!cache.store().contains("draftdesk:project:p1"));
    }

    #[test]
    fn test_malformed_entry_is_evicted() {
        let store = MemoryStore::new();
        store.set("draftdesk:project:p1", "{not json").unwrap();
        let empty = r#"{"data": {"id": "p2", "content": {}}, "timestamp": 0}"#;
        store.set("draftdesk:project:p2", empty).unwrap();
        let cache = SnapshotCache::new(store.clone(), DEFAULT_CACHE_TTL_MS);

        assert_eq!(cache.get("p1", 0), None);
        assert_eq!(cache.get("p2", 0), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_storage_failure_is_a_miss() {
        let cache = SnapshotCache::new(MemoryStore::with_quota(8), DEFAULT_CACHE_TTL_MS);
        cache.set("p1", &document("p1"), 0);
        assert_eq!(cache.get("p1", 0), None);
    }

    #[test]
    fn test_clear_and_clear_all() {
        let cache = cache();
        cache.set("p1", &document("p1"), 0);
        cache.set("p2", &document("p2"), 0);

        cache.clear("p1");
        assert_eq!(cache.get("p1", 0), None);
        assert!(cache.get("p2", 0).is_some());

        cache.clear_all();
        assert_eq!(cache.get("p2", 0), None);
    }
}
