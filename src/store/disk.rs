use crate::core::cache::KeyValueStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "indicators";

/// Persistent store backed by a fjall partition.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path.join("cache"))
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open indicator partition")?;
        debug!("Opened disk store at {}", path.display());

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

#[async_trait]
impl KeyValueStore for DiskStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.partition.get(key.as_bytes())? {
            Some(raw) => Ok(Some(String::from_utf8(raw.to_vec())?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.partition.insert(key.as_bytes(), value.as_bytes())?;
        // Each CLI run is short lived, flush the journal before returning.
        self.keyspace.persist(PersistMode::Buffer)?;
        debug!("Store PUT for key: {}", key);
        Ok(())
    }
}
