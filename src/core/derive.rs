//! Unit conversions applied while assembling a snapshot

/// Grams in one troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Bitcoin price in CLP from its USD price and the CLP-per-USD rate.
pub fn btc_clp(btc_usd: Option<f64>, usd_rate: Option<f64>) -> Option<f64> {
    Some(btc_usd? * usd_rate?)
}

/// Gold price in CLP per gram from a USD per troy ounce quote.
pub fn gold_clp_per_gram(usd_per_ounce: f64, usd_rate: f64) -> f64 {
    (usd_per_ounce * usd_rate) / TROY_OUNCE_GRAMS
}

/// Composes `from -> via` and `via -> CLP` into `from -> CLP`.
pub fn cross_rate(from_in_via: f64, via_in_clp: f64) -> f64 {
    from_in_via * via_in_clp
}
