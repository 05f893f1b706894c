//! In-memory session token store backed by a `HashMap` behind a `Mutex`.

use async_trait::async_trait;
use keygate_types::SessionTokenStore;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// An in-memory [`SessionTokenStore`].
///
/// The lock is only held for the duration of a single map operation, never
/// across an await point.
pub struct InMemorySessionStore {
    /// Plugin token → session token.
    data: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionTokenStore for InMemorySessionStore {
    async fn load(&self, plugin_token: &str) -> Option<String> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(plugin_token)
            .cloned()
    }

    async fn save(&self, plugin_token: &str, session_token: String) {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plugin_token.to_string(), session_token);
        tracing::debug!("session token cached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemorySessionStore::new();
        store.save("ghu_plugin", "tid=session".into()).await;
        assert_eq!(store.load("ghu_plugin").await.as_deref(), Some("tid=session"));
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store = InMemorySessionStore::new();
        assert!(store.load("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = InMemorySessionStore::new();
        store.save("ghu_plugin", "first".into()).await;
        store.save("ghu_plugin", "second".into()).await;
        assert_eq!(store.load("ghu_plugin").await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = InMemorySessionStore::new();
        store.save("ghu_a", "tid=a".into()).await;
        store.save("ghu_b", "tid=b".into()).await;
        assert_eq!(store.load("ghu_a").await.as_deref(), Some("tid=a"));
        assert_eq!(store.load("ghu_b").await.as_deref(), Some("tid=b"));
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_one_entry() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.save("shared", format!("session-{i}")).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let value = store.load("shared").await.unwrap();
        assert!(value.starts_with("session-"));
    }
}
