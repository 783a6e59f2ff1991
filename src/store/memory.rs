use crate::core::cache::KeyValueStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory store backed by a HashMap, used for tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let store = self.inner.lock().await;
        Ok(store.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> anyhow::Result<()> {
        let mut store = self.inner.lock().await;
        debug!("Store PUT for key: {}", key);
        store.insert(key.to_string(), value);
        Ok(())
    }
}
