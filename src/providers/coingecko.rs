use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::{Quote, QuoteSource};

/// Coins the watcher can resolve, as (ticker, CoinGecko id).
pub const KNOWN_COINS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("BNB", "binancecoin"),
    ("SOL", "solana"),
    ("XRP", "ripple"),
    ("DOGE", "dogecoin"),
    ("ADA", "cardano"),
    ("LTC", "litecoin"),
];

/// Maps a ticker (any case) or a CoinGecko id onto the upstream id.
pub fn resolve_coin_id(symbol: &str) -> Option<&'static str> {
    KNOWN_COINS
        .iter()
        .find(|(ticker, id)| ticker.eq_ignore_ascii_case(symbol) || *id == symbol)
        .map(|(_, id)| *id)
}

pub struct CoinGeckoProvider {
    base_url: String,
    vs_currency: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, vs_currency: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pricewatch/0.1")
            .build()
            .context("Failed to build HTTP client for CoinGecko")?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            vs_currency: vs_currency.to_lowercase(),
            client,
        })
    }

    /// Pulls `{vs}` and `{vs}_24h_change` for `coin_id` out of a simple-price response.
    fn extract_quote(&self, coin_id: &str, data: &HashMap<String, Value>) -> Result<Quote> {
        let prices = data
            .get(coin_id)
            .ok_or_else(|| anyhow!("No price data found for coin: {}", coin_id))?;

        let field = |name: String| -> Result<f64> {
            prices
                .get(&name)
                .and_then(Value::as_f64)
                .ok_or_else(|| anyhow!("Missing '{}' for coin: {}", name, coin_id))
        };

        let price = field(self.vs_currency.clone())?;
        let percent_change = field(format!("{}_24h_change", self.vs_currency))?;
        Ok(Quote::new(price, percent_change))
    }
}

#[async_trait]
impl QuoteSource for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    #[instrument(name = "CoinGeckoQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let coin_id =
            resolve_coin_id(symbol).ok_or_else(|| anyhow!("Unknown coin symbol: {}", symbol))?;

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies={}&include_24hr_change=true",
            self.base_url, coin_id, self.vs_currency
        );
        debug!("Requesting price data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for coin: {}", e, coin_id))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for coin: {}",
                response.status(),
                coin_id
            ));
        }

        let text = response.text().await?;
        let data: HashMap<String, Value> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", coin_id, e))?;

        self.extract_quote(coin_id, &data)
    }
}
