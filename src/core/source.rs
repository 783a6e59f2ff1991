//! Remote indicator source abstraction

use crate::core::error::Result;
use crate::core::indicator::{GoldQuote, IndicatorSnapshot};
use async_trait::async_trait;

#[async_trait]
pub trait IndicatorSource: Send + Sync {
    /// Fetches every indicator except gold. All-or-nothing: any failed
    /// remote call fails the whole snapshot.
    async fn fetch_snapshot(&self) -> Result<IndicatorSnapshot>;

    /// Fetches the gold price in CLP per gram. `fetched` is the snapshot
    /// this same cycle just fetched, if any; sources reuse its values
    /// instead of querying them again.
    async fn fetch_gold(&self, fetched: Option<&IndicatorSnapshot>) -> Result<GoldQuote>;
}
