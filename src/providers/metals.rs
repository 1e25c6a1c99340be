//! Placeholder precious-metals quotes.
//!
//! No metals feed is queried. Each known instrument has a fixed baseline price
//! and change which are jittered by a pseudo-random offset on every fetch, so
//! the tool stays usable without a paid metals API key. These numbers are NOT
//! market data and must not be relied upon.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::core::{Quote, QuoteSource};

pub struct Instrument {
    pub symbol: &'static str,
    pub base_price: f64,
    pub base_change: f64,
}

pub const INSTRUMENTS: &[Instrument] = &[
    // London gold, USD/oz
    Instrument {
        symbol: "XAU",
        base_price: 2650.0,
        base_change: 0.35,
    },
    // London silver, USD/oz
    Instrument {
        symbol: "XAG",
        base_price: 31.2,
        base_change: -0.12,
    },
    // Shanghai gold Au99.99, CNY/g
    Instrument {
        symbol: "AU9999",
        base_price: 612.5,
        base_change: 0.28,
    },
];

/// Largest price move as a fraction of the baseline.
const PRICE_JITTER: f64 = 0.005;
/// Largest change move, in percentage points.
const CHANGE_JITTER: f64 = 0.2;

pub fn find_instrument(symbol: &str) -> Option<&'static Instrument> {
    INSTRUMENTS
        .iter()
        .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
}

pub struct MetalsProvider {
    rng: Mutex<StdRng>,
}

impl MetalsProvider {
    pub fn new() -> Self {
        MetalsProvider {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reproducible quotes for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        MetalsProvider {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next_offset(&self) -> Result<f64> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| anyhow!("Metals generator lock poisoned"))?;
        Ok(rng.random_range(-1.0..1.0))
    }
}

impl Default for MetalsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for MetalsProvider {
    fn name(&self) -> &'static str {
        "metals"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let instrument =
            find_instrument(symbol).ok_or_else(|| anyhow!("Unknown metal instrument: {}", symbol))?;

        // One draw moves both values so price and change stay in step.
        let offset = self.next_offset()?;
        Ok(Quote::new(
            instrument.base_price * (1.0 + offset * PRICE_JITTER),
            instrument.base_change + offset * CHANGE_JITTER,
        ))
    }
}
