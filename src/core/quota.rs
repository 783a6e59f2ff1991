//! Daily fetch budget

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

pub const MAX_PER_DAY: u32 = 4;
pub const WINDOW_START_HOUR: u32 = 7;
pub const WINDOW_END_HOUR: u32 = 24;

/// Number of remote fetch cycles performed on one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    #[serde(alias = "consultas")]
    pub count: u32,
    #[serde(rename = "lastFetchTimestamp", alias = "ultimaConsulta")]
    pub last_fetch_timestamp: Option<String>,
}

/// Decides whether a remote fetch is allowed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaPolicy {
    pub max_per_day: u32,
    pub window_start: u32,
    pub window_end: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            max_per_day: MAX_PER_DAY,
            window_start: WINDOW_START_HOUR,
            window_end: WINDOW_END_HOUR,
        }
    }
}

impl QuotaPolicy {
    /// `[window_start, window_end)` over a 24 hour clock.
    pub fn in_window(&self, now: NaiveDateTime) -> bool {
        let hour = now.hour();
        hour >= self.window_start && hour < self.window_end
    }

    pub fn is_exhausted(&self, record: &QuotaRecord) -> bool {
        record.count >= self.max_per_day
    }

    pub fn can_fetch(&self, now: NaiveDateTime, record: &QuotaRecord) -> bool {
        self.in_window(now) && !self.is_exhausted(record)
    }
}
