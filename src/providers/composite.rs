use super::mindicador::{MindicadorProvider, PrimaryIndicators};
use super::quotes::QuoteProvider;
use crate::core::config::{ProviderConfig, ProvidersConfig};
use crate::core::derive::{btc_clp, cross_rate, gold_clp_per_gram};
use crate::core::error::{IndicatorError, Result};
use crate::core::indicator::{GoldQuote, IndicatorCode, IndicatorSnapshot, Reading};
use crate::core::source::IndicatorSource;
use async_trait::async_trait;
use tracing::{debug, instrument};

pub const BITCOIN_SYMBOL: &str = "BTC";
pub const GOLD_SYMBOL: &str = "XAUT";

/// Assembles snapshots from the primary endpoint, optionally overriding
/// currency rates, bitcoin and gold with dedicated quote services.
pub struct CompositeSource {
    primary: MindicadorProvider,
    cross_rate: Option<QuoteProvider>,
    crypto: Option<QuoteProvider>,
    metal: Option<QuoteProvider>,
}

impl CompositeSource {
    pub fn new(
        primary: MindicadorProvider,
        cross_rate: Option<QuoteProvider>,
        crypto: Option<QuoteProvider>,
        metal: Option<QuoteProvider>,
    ) -> Self {
        Self {
            primary,
            cross_rate,
            crypto,
            metal,
        }
    }

    pub fn from_config(config: &ProvidersConfig, retries: usize) -> Self {
        let quotes = |provider: &Option<ProviderConfig>| {
            provider
                .as_ref()
                .map(|p| QuoteProvider::new(&p.base_url, retries))
        };
        Self::new(
            MindicadorProvider::new(&config.mindicador.base_url, retries),
            quotes(&config.cross_rate),
            quotes(&config.crypto),
            quotes(&config.metal),
        )
    }

    /// USD and EUR in CLP. With a cross-rate service EUR is composed through
    /// USD, so the EUR call depends on the USD one.
    async fn currency_rates(&self, primary: &PrimaryIndicators) -> Result<(Reading, Reading)> {
        let Some(fx) = &self.cross_rate else {
            return Ok((primary.dolar.clone(), primary.euro.clone()));
        };

        let usd = fx.get_rate("USD", "CLP").await?;
        let eur_usd = fx.get_rate("EUR", "USD").await?;
        let eur = cross_rate(eur_usd.price, usd.price);
        debug!(usd = usd.price, eur, "Composed cross rates");

        Ok((
            Reading::new(Some(usd.price), usd.timestamp),
            Reading::new(Some(eur), eur_usd.timestamp),
        ))
    }

    async fn bitcoin_usd(&self, primary: &PrimaryIndicators) -> Result<Reading> {
        match &self.crypto {
            Some(crypto) => {
                let quote = crypto.get_price(BITCOIN_SYMBOL).await?;
                Ok(Reading::new(Some(quote.price), quote.timestamp))
            }
            None => Ok(primary.bitcoin.clone()),
        }
    }

    /// CLP per USD, used to price gold.
    async fn usd_rate(&self, fetched: Option<&IndicatorSnapshot>) -> Result<f64> {
        if let Some(usd) = fetched.and_then(|s| s.value(IndicatorCode::Usd)) {
            return Ok(usd);
        }
        match &self.cross_rate {
            Some(fx) => Ok(fx.get_rate("USD", "CLP").await?.price),
            None => self
                .primary
                .fetch()
                .await?
                .dolar
                .value
                .ok_or_else(|| IndicatorError::Parse("Primary source has no USD rate".to_string())),
        }
    }
}

#[async_trait]
impl IndicatorSource for CompositeSource {
    #[instrument(name = "SnapshotFetch", skip(self))]
    async fn fetch_snapshot(&self) -> Result<IndicatorSnapshot> {
        let primary = self.primary.fetch().await?;
        let (usd, eur) = self.currency_rates(&primary).await?;
        let btc_usd = self.bitcoin_usd(&primary).await?;

        let mut snapshot = IndicatorSnapshot::new(primary.date.clone());
        snapshot.set(IndicatorCode::Uf, primary.uf);
        snapshot.set(IndicatorCode::Utm, primary.utm);
        snapshot.set(IndicatorCode::Ipc, primary.ipc);
        snapshot.set(IndicatorCode::Imacec, primary.imacec);
        snapshot.set(IndicatorCode::Cobre, primary.cobre);
        snapshot.set(
            IndicatorCode::Btc,
            Reading::new(btc_clp(btc_usd.value, usd.value), btc_usd.timestamp),
        );
        snapshot.set(IndicatorCode::Usd, usd);
        snapshot.set(IndicatorCode::Eur, eur);
        if self.metal.is_none() {
            // Already CLP per gram.
            snapshot.set(IndicatorCode::Oro, primary.oro);
        }
        Ok(snapshot)
    }

    #[instrument(name = "GoldFetch", skip(self, fetched))]
    async fn fetch_gold(&self, fetched: Option<&IndicatorSnapshot>) -> Result<GoldQuote> {
        let Some(metal) = &self.metal else {
            let oro = match fetched {
                Some(snapshot) => snapshot.get(IndicatorCode::Oro).clone(),
                None => self.primary.fetch().await?.oro,
            };
            let value = oro
                .value
                .ok_or_else(|| IndicatorError::Parse("Primary source has no gold price".to_string()))?;
            return Ok(GoldQuote {
                value,
                timestamp: oro.timestamp,
            });
        };

        let (ounce, usd_rate) = futures::try_join!(
            metal.get_price(GOLD_SYMBOL),
            self.usd_rate(fetched)
        )?;
        Ok(GoldQuote {
            value: gold_clp_per_gram(ounce.price, usd_rate),
            timestamp: ounce.timestamp,
        })
    }
}
