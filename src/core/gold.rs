use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Hour at which the afternoon gold block starts.
pub const PM_START_HOUR: u32 = 16;

/// Half-day partition that throttles gold refreshes to two per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoldBlock {
    Am,
    Pm,
}

impl GoldBlock {
    pub fn resolve(now: NaiveDateTime) -> Self {
        if now.hour() < PM_START_HOUR {
            GoldBlock::Am
        } else {
            GoldBlock::Pm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoldBlock::Am => "am",
            GoldBlock::Pm => "pm",
        }
    }

    /// The other half of the same day.
    pub fn other(&self) -> Self {
        match self {
            GoldBlock::Am => GoldBlock::Pm,
            GoldBlock::Pm => GoldBlock::Am,
        }
    }
}

impl Display for GoldBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
