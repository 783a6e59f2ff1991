//! Linked-field currency conversion

use crate::core::error::{IndicatorError, Result};
use crate::core::indicator::{IndicatorCode, IndicatorSnapshot};
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

/// One of the five linked input fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    Clp,
    Uf,
    Usd,
    Eur,
    Utm,
}

impl Field {
    pub const ALL: [Field; 5] = [Field::Clp, Field::Uf, Field::Usd, Field::Eur, Field::Utm];

    pub fn code(&self) -> IndicatorCode {
        match self {
            Field::Clp => IndicatorCode::Clp,
            Field::Uf => IndicatorCode::Uf,
            Field::Usd => IndicatorCode::Usd,
            Field::Eur => IndicatorCode::Eur,
            Field::Utm => IndicatorCode::Utm,
        }
    }

    /// Decimals shown for an amount in this field.
    pub fn decimals(&self) -> usize {
        match self {
            Field::Clp => 0,
            Field::Usd | Field::Eur => 2,
            Field::Uf | Field::Utm => 4,
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code().as_str().to_uppercase())
    }
}

impl FromStr for Field {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .into_iter()
            .find(|field| field.code().as_str() == s.to_lowercase())
            .ok_or_else(|| IndicatorError::UnknownField(s.to_string()))
    }
}

/// Amount expressed in every field. `None` where the target rate is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub source: Field,
    pub clp: f64,
    pub uf: Option<f64>,
    pub usd: Option<f64>,
    pub eur: Option<f64>,
    pub utm: Option<f64>,
}

impl Conversion {
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Clp => Some(self.clp),
            Field::Uf => self.uf,
            Field::Usd => self.usd,
            Field::Eur => self.eur,
            Field::Utm => self.utm,
        }
    }

    /// Value rounded to the field's display precision.
    pub fn rounded(&self, field: Field) -> Option<f64> {
        let factor = 10f64.powi(field.decimals() as i32);
        self.get(field).map(|v| (v * factor).round() / factor)
    }
}

fn rate(snapshot: &IndicatorSnapshot, field: Field) -> Option<f64> {
    snapshot.value(field.code()).filter(|r| *r > 0.0)
}

/// Converts `amount` typed into `source` into every other field, going
/// through CLP.
pub fn convert(source: Field, amount: f64, snapshot: &IndicatorSnapshot) -> Result<Conversion> {
    let source_rate =
        rate(snapshot, source).ok_or_else(|| IndicatorError::MissingRate(source.to_string()))?;
    let clp = amount * source_rate;
    let target = |field: Field| rate(snapshot, field).map(|r| clp / r);

    Ok(Conversion {
        source,
        clp,
        uf: target(Field::Uf),
        usd: target(Field::Usd),
        eur: target(Field::Eur),
        utm: target(Field::Utm),
    })
}
