//! Indicator codes and snapshot types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCode {
    Clp,
    Uf,
    Usd,
    Eur,
    Utm,
    Oro,
    Cobre,
    Btc,
    Ipc,
    Imacec,
}

impl IndicatorCode {
    /// All codes in display order.
    pub const ALL: [IndicatorCode; 10] = [
        IndicatorCode::Clp,
        IndicatorCode::Uf,
        IndicatorCode::Usd,
        IndicatorCode::Eur,
        IndicatorCode::Utm,
        IndicatorCode::Oro,
        IndicatorCode::Cobre,
        IndicatorCode::Btc,
        IndicatorCode::Ipc,
        IndicatorCode::Imacec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorCode::Clp => "clp",
            IndicatorCode::Uf => "uf",
            IndicatorCode::Usd => "usd",
            IndicatorCode::Eur => "eur",
            IndicatorCode::Utm => "utm",
            IndicatorCode::Oro => "oro",
            IndicatorCode::Cobre => "cobre",
            IndicatorCode::Btc => "btc",
            IndicatorCode::Ipc => "ipc",
            IndicatorCode::Imacec => "imacec",
        }
    }

    /// Human readable label used by the presenters.
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorCode::Clp => "Peso chileno",
            IndicatorCode::Uf => "Unidad de Fomento",
            IndicatorCode::Usd => "Dólar observado",
            IndicatorCode::Eur => "Euro",
            IndicatorCode::Utm => "Unidad Tributaria Mensual",
            IndicatorCode::Oro => "Oro (gramo)",
            IndicatorCode::Cobre => "Cobre (libra)",
            IndicatorCode::Btc => "Bitcoin",
            IndicatorCode::Ipc => "IPC",
            IndicatorCode::Imacec => "Imacec",
        }
    }
}

impl Display for IndicatorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single indicator value with the time it was published. `None` marks
/// the value or the timestamp as unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: Option<f64>,
    pub timestamp: Option<String>,
}

impl Reading {
    pub fn new(value: Option<f64>, timestamp: Option<String>) -> Self {
        Self { value, timestamp }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }
}

/// The complete set of indicators captured by one refresh cycle.
///
/// `clp` is the base unit and always holds exactly 1; [`IndicatorSnapshot::set`]
/// refuses to overwrite its value.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    readings: BTreeMap<IndicatorCode, Reading>,
}

impl IndicatorSnapshot {
    /// Creates a snapshot with every indicator unavailable except the base unit.
    pub fn new(clp_timestamp: Option<String>) -> Self {
        let mut readings: BTreeMap<IndicatorCode, Reading> = IndicatorCode::ALL
            .into_iter()
            .map(|code| (code, Reading::unavailable()))
            .collect();
        readings.insert(IndicatorCode::Clp, Reading::new(Some(1.0), clp_timestamp));
        Self { readings }
    }

    /// Snapshot rendered when neither the remote sources nor the cache have data.
    pub fn unavailable() -> Self {
        Self::new(None)
    }

    pub fn get(&self, code: IndicatorCode) -> &Reading {
        // Every code is inserted on construction.
        &self.readings[&code]
    }

    pub fn value(&self, code: IndicatorCode) -> Option<f64> {
        self.get(code).value
    }

    pub fn set(&mut self, code: IndicatorCode, reading: Reading) {
        if code == IndicatorCode::Clp {
            self.readings.insert(code, Reading::new(Some(1.0), reading.timestamp));
        } else {
            self.readings.insert(code, reading);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndicatorCode, &Reading)> {
        self.readings.iter().map(|(code, reading)| (*code, reading))
    }

    /// True when no indicator besides the base unit has a value.
    pub fn is_empty(&self) -> bool {
        self.iter()
            .all(|(code, reading)| code == IndicatorCode::Clp || !reading.is_available())
    }
}

impl Default for IndicatorSnapshot {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Persisted form of a snapshot: `{ "values": {..}, "timestamps": {..} }`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SnapshotRecord {
    values: BTreeMap<IndicatorCode, Option<f64>>,
    timestamps: BTreeMap<IndicatorCode, Option<String>>,
}

impl From<&IndicatorSnapshot> for SnapshotRecord {
    fn from(snapshot: &IndicatorSnapshot) -> Self {
        Self {
            values: snapshot
                .iter()
                .map(|(code, reading)| (code, reading.value))
                .collect(),
            timestamps: snapshot
                .iter()
                .map(|(code, reading)| (code, reading.timestamp.clone()))
                .collect(),
        }
    }
}

impl From<SnapshotRecord> for IndicatorSnapshot {
    fn from(mut record: SnapshotRecord) -> Self {
        let mut snapshot = IndicatorSnapshot::new(None);
        for code in IndicatorCode::ALL {
            let value = record.values.remove(&code).flatten();
            let timestamp = record.timestamps.remove(&code).flatten();
            snapshot.set(code, Reading::new(value, timestamp));
        }
        snapshot
    }
}

/// Gold price expressed in CLP per gram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldQuote {
    pub value: f64,
    pub timestamp: Option<String>,
}

impl From<GoldQuote> for Reading {
    fn from(quote: GoldQuote) -> Self {
        Reading::new(Some(quote.value), quote.timestamp)
    }
}
