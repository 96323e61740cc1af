// Local ephemeral store: tab-session key/value strings
//
// In the browser this is `window.sessionStorage`; elsewhere an in-memory map.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::types::{DraftError, Result};

/// Key -> string storage scoped to the tab session
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses values longer than `bytes`, like a full quota
    pub fn with_quota(bytes: usize) -> Self {
        MemoryStore { quota: Some(bytes), ..Default::default() }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(DraftError::InvalidOperation(format!(
                    "Quota exceeded: {} bytes > {}",
                    value.len(),
                    quota
                )));
            }
        }
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserSessionStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::SessionStore;
    use crate::types::{DraftError, Result};
    use wasm_bindgen::JsValue;

    fn storage_error(op: &str, err: JsValue) -> DraftError {
        DraftError::InvalidOperation(format!("sessionStorage.{} failed: {:?}", op, err))
    }

    /// `window.sessionStorage`
    pub struct BrowserSessionStore {
        storage: web_sys::Storage,
    }

    impl BrowserSessionStore {
        pub fn new() -> Result<Self> {
            let window =
                web_sys::window().ok_or_else(|| DraftError::Init("no window".to_string()))?;
            let storage = window
                .session_storage()
                .map_err(|e| storage_error("open", e))?
                .ok_or_else(|| DraftError::Init("sessionStorage unavailable".to_string()))?;
            Ok(BrowserSessionStore { storage })
        }
    }

    impl SessionStore for BrowserSessionStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.storage.get_item(key).map_err(|e| storage_error("getItem", e))
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.storage.set_item(key, value).map_err(|e| storage_error("setItem", e))
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.storage.remove_item(key).map_err(|e| storage_error("removeItem", e))
        }

        fn clear(&self) -> Result<()> {
            self.storage.clear().map_err(|e| storage_error("clear", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", "v").unwrap();
        assert!(other.contains("k"));

        other.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_quota() {
        let store = MemoryStore::with_quota(4);
        assert!(store.set("k", "1234").is_ok());
        assert!(store.set("k", "12345").is_err());
        assert_eq!(store.get("k").unwrap(), Some("1234".to_string()));
    }
}
