//! Typed indicator cache on top of a string key-value store

use crate::core::clock::day_key;
use crate::core::error::{IndicatorError, Result};
use crate::core::gold::GoldBlock;
use crate::core::indicator::{GoldQuote, IndicatorSnapshot, SnapshotRecord};
use crate::core::quota::QuotaRecord;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SNAPSHOT_KEY_PREFIX: &str = "finDatos_";
pub const QUOTA_KEY: &str = "estadoConsultas";

/// A persistent string key-value store, e.g. browser local storage or an
/// embedded database.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> anyhow::Result<()>;
}

pub fn snapshot_key(day: NaiveDate) -> String {
    format!("{SNAPSHOT_KEY_PREFIX}{}", day_key(day))
}

pub fn gold_key(day: NaiveDate, block: GoldBlock) -> String {
    format!("{}_oro_{}", day_key(day), block)
}

type QuotaTable = BTreeMap<String, QuotaRecord>;

/// Owns every persisted record: daily snapshots, the quota table and the
/// gold block quotes.
#[derive(Clone)]
pub struct IndicatorCache {
    store: Arc<dyn KeyValueStore>,
}

impl IndicatorCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads and decodes a key. Any failure is a cache miss.
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache MISS for key: {}", key);
                return None;
            }
            Err(e) => {
                warn!(error = %e, key, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache HIT for key: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, key, "Discarding corrupt cache entry");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| IndicatorError::CacheWrite(format!("{key}: {e}")))?;
        self.store
            .put(key, raw)
            .await
            .map_err(|e| IndicatorError::CacheWrite(format!("{key}: {e}")))?;
        debug!("Cache PUT for key: {}", key);
        Ok(())
    }

    pub async fn load_snapshot(&self, day: NaiveDate) -> Option<IndicatorSnapshot> {
        self.read::<SnapshotRecord>(&snapshot_key(day))
            .await
            .map(IndicatorSnapshot::from)
    }

    pub async fn save_snapshot(&self, day: NaiveDate, snapshot: &IndicatorSnapshot) -> Result<()> {
        self.write(&snapshot_key(day), &SnapshotRecord::from(snapshot))
            .await
    }

    pub async fn load_quota(&self, day: NaiveDate) -> QuotaRecord {
        self.read::<QuotaTable>(QUOTA_KEY)
            .await
            .and_then(|mut table| table.remove(&day_key(day)))
            .unwrap_or_default()
    }

    /// Bumps today's counter and stamps the fetch time. The whole table is
    /// read and written back within one call.
    pub async fn increment_quota(&self, day: NaiveDate, now: NaiveDateTime) -> Result<QuotaRecord> {
        let mut table: QuotaTable = self.read(QUOTA_KEY).await.unwrap_or_default();
        let record = table.entry(day_key(day)).or_default();
        record.count += 1;
        record.last_fetch_timestamp = Some(now.format("%Y-%m-%dT%H:%M:%S").to_string());
        let updated = record.clone();

        self.write(QUOTA_KEY, &table).await?;
        Ok(updated)
    }

    pub async fn load_gold_block(&self, day: NaiveDate, block: GoldBlock) -> Option<GoldQuote> {
        self.read(&gold_key(day, block)).await
    }

    pub async fn save_gold_block(
        &self,
        day: NaiveDate,
        block: GoldBlock,
        quote: &GoldQuote,
    ) -> Result<()> {
        self.write(&gold_key(day, block), quote).await
    }
}
