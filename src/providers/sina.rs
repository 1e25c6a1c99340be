//! Regional-exchange quotes (Shanghai, Shenzhen and Hong Kong) from the Sina
//! real-time quote feed.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, instrument};

use crate::core::{Quote, QuoteSource};

/// Bodies shorter than this carry no quote (an empty feed is `var hq_str_x="";`).
const MIN_BODY_LEN: usize = 32;
const NULL_FEED: &str = "null";

static QUOTED_FIELDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("valid quote feed pattern"));

pub struct SinaProvider {
    base_url: String,
    referer: String,
    client: reqwest::Client,
}

impl SinaProvider {
    pub fn new(base_url: &str, referer: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pricewatch/0.1")
            .build()
            .context("Failed to build HTTP client for Sina")?;
        Ok(SinaProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            referer: referer.to_string(),
            client,
        })
    }
}

/// Cheap check run before parsing: rejects null feeds and bodies too short to hold a quote.
fn has_quote(body: &str) -> bool {
    !body.contains(NULL_FEED) && body.chars().count() >= MIN_BODY_LEN
}

/// Extracts price and change from `var hq_str_<symbol>="name,f1,f2,...";`.
///
/// The mapping is positional: field 1 is the last price and field 2 fills the
/// change slot. For mainland symbols the upstream's field 2 is the previous
/// close, not a percentage; it is reported as-is.
fn parse_quote(body: &str) -> Result<Quote> {
    let fields = QUOTED_FIELDS
        .captures(body)
        .and_then(|c| c.get(1))
        .ok_or_else(|| anyhow!("No quoted field list in response"))?
        .as_str();

    let mut parts = fields.split(',').skip(1);
    let mut next_number = |label: &str| -> Result<f64> {
        let raw = parts
            .next()
            .ok_or_else(|| anyhow!("Missing {} field in '{}'", label, fields))?;
        raw.trim()
            .parse::<f64>()
            .with_context(|| format!("Invalid {label} field '{raw}'"))
    };

    let price = next_number("price")?;
    let percent_change = next_number("change")?;
    Ok(Quote::new(price, percent_change))
}

#[async_trait]
impl QuoteSource for SinaProvider {
    fn name(&self) -> &'static str {
        "sina"
    }

    #[instrument(name = "SinaQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/list={}", self.base_url, symbol);
        debug!("Requesting quote from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::REFERER, &self.referer)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let bytes = response.bytes().await?;
        let (body, _, _) = encoding_rs::GBK.decode(&bytes);
        debug!(body = %body, "Received Sina response");

        if !has_quote(&body) {
            return Err(anyhow!("No data in feed for symbol: {}", symbol));
        }

        parse_quote(&body).with_context(|| format!("Failed to parse quote for symbol: {symbol}"))
    }
}
