//! Normalized quote types and the source abstraction every adapter implements

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Display;
use tracing::debug;

/// Price and signed percent change for one symbol at fetch time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub percent_change: f64,
}

impl Quote {
    pub fn new(price: f64, percent_change: f64) -> Self {
        Quote {
            price,
            percent_change,
        }
    }
}

/// Result of a single adapter call.
///
/// Every failure kind (network, malformed payload, upstream "no data",
/// unknown symbol, timeout) collapses into `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchOutcome {
    Success(Quote),
    Unavailable,
}

impl FetchOutcome {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            FetchOutcome::Success(quote) => Some(quote),
            FetchOutcome::Unavailable => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

impl Display for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOutcome::Success(q) => write!(f, "{:.2} ({:+.2}%)", q.price, q.percent_change),
            FetchOutcome::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A price source that turns a symbol identifier into a quote.
///
/// Implementors only write `fetch_quote`; callers use `fetch`, which never
/// fails and reports any error as [`FetchOutcome::Unavailable`].
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;

    async fn fetch(&self, symbol: &str) -> FetchOutcome {
        match self.fetch_quote(symbol).await {
            Ok(quote) => FetchOutcome::Success(quote),
            Err(e) => {
                debug!(source = self.name(), %symbol, error = %e, "Quote unavailable");
                FetchOutcome::Unavailable
            }
        }
    }
}
