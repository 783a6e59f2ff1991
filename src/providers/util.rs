use crate::core::error::{IndicatorError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

const USER_AGENT: &str = concat!("cotiza/", env!("CARGO_PKG_VERSION"));
const RETRY_DELAY_MS: u64 = 500;

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// GETs `url` and decodes the JSON body. Connection failures are retried;
/// a non-success status is a network error and a bad body a parse error.
pub async fn fetch_json<T: DeserializeOwned>(url: &str, retries: usize) -> Result<T> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    debug!("Requesting {}", url);

    let response = with_retry(|| client.get(url).send(), retries, RETRY_DELAY_MS)
        .await
        .map_err(|e| IndicatorError::Network(format!("Request error: {e} for URL: {url}")))?;

    if !response.status().is_success() {
        return Err(IndicatorError::Network(format!(
            "HTTP error: {} for URL: {}",
            response.status(),
            url
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| IndicatorError::Network(format!("Failed to read body from {url}: {e}")))?;

    serde_json::from_str(&text).map_err(|e| {
        error!(error = ?e, response = %text, "Failed to parse response");
        IndicatorError::Parse(format!("Failed to parse JSON response from {url}: {e}"))
    })
}

/// Update time as sent by a provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(i64),
    EpochFloat(f64),
    Text(String),
}

impl RawTimestamp {
    /// Normalizes to RFC 3339 in UTC. Text that is not a recognizable date
    /// is kept as sent.
    pub fn normalize(&self) -> Option<String> {
        match self {
            RawTimestamp::Epoch(secs) => epoch_to_iso(*secs),
            RawTimestamp::EpochFloat(secs) => epoch_to_iso(secs.trunc() as i64),
            RawTimestamp::Text(text) => {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                    return Some(to_iso(parsed.with_timezone(&Utc)));
                }
                if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                    return date.and_hms_opt(0, 0, 0).map(|dt| to_iso(dt.and_utc()));
                }
                debug!("Keeping unrecognized timestamp: {}", text);
                Some(text.clone())
            }
        }
    }
}

fn epoch_to_iso(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(to_iso)
}

fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn normalize(timestamp: Option<&RawTimestamp>) -> Option<String> {
    timestamp.and_then(RawTimestamp::normalize)
}
