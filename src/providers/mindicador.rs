use super::util::{RawTimestamp, fetch_json, normalize};
use crate::core::error::Result;
use crate::core::indicator::Reading;
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct MindicadorResponse {
    fecha: Option<RawTimestamp>,
    uf: Option<Serie>,
    utm: Option<Serie>,
    dolar: Option<Serie>,
    euro: Option<Serie>,
    ipc: Option<Serie>,
    imacec: Option<Serie>,
    libra_cobre: Option<Serie>,
    bitcoin: Option<Serie>,
    oro: Option<Serie>,
}

#[derive(Debug, Deserialize)]
struct Serie {
    valor: Option<f64>,
    fecha: Option<RawTimestamp>,
}

fn reading(serie: Option<&Serie>) -> Reading {
    serie.map_or_else(Reading::unavailable, |s| {
        Reading::new(s.valor, normalize(s.fecha.as_ref()))
    })
}

/// Values published by the primary endpoint, as published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryIndicators {
    pub date: Option<String>,
    pub uf: Reading,
    pub utm: Reading,
    pub dolar: Reading,
    pub euro: Reading,
    pub ipc: Reading,
    pub imacec: Reading,
    /// USD per pound.
    pub cobre: Reading,
    /// USD per bitcoin.
    pub bitcoin: Reading,
    /// CLP per gram.
    pub oro: Reading,
}

/// Client for the mindicador.cl daily indicators endpoint.
pub struct MindicadorProvider {
    base_url: String,
    retries: usize,
}

impl MindicadorProvider {
    pub fn new(base_url: &str, retries: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
        }
    }

    #[instrument(name = "MindicadorFetch", skip(self))]
    pub async fn fetch(&self) -> Result<PrimaryIndicators> {
        let url = format!("{}/api", self.base_url);
        let data: MindicadorResponse = fetch_json(&url, self.retries).await?;

        Ok(PrimaryIndicators {
            date: normalize(data.fecha.as_ref()),
            uf: reading(data.uf.as_ref()),
            utm: reading(data.utm.as_ref()),
            dolar: reading(data.dolar.as_ref()),
            euro: reading(data.euro.as_ref()),
            ipc: reading(data.ipc.as_ref()),
            imacec: reading(data.imacec.as_ref()),
            cobre: reading(data.libra_cobre.as_ref()),
            bitcoin: reading(data.bitcoin.as_ref()),
            oro: reading(data.oro.as_ref()),
        })
    }
}
