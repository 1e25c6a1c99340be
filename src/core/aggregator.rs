//! Fetches every watchlist symbol from its bound source and assembles an ordered report.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::{FetchConfig, GroupKey, ProvidersConfig, SymbolEntry, Watchlist, WatchlistGroup};
use super::config::{DEFAULT_COINGECKO_URL, DEFAULT_SINA_REFERER, DEFAULT_SINA_URL, DEFAULT_VS_CURRENCY};
use super::quote::{FetchOutcome, QuoteSource};
use crate::providers::{CoinGeckoProvider, MetalsProvider, SinaProvider};

/// One adapter per upstream family.
#[derive(Clone)]
pub struct Sources {
    regional: Arc<dyn QuoteSource>,
    crypto: Arc<dyn QuoteSource>,
    metals: Arc<dyn QuoteSource>,
}

impl Sources {
    pub fn new(
        regional: Arc<dyn QuoteSource>,
        crypto: Arc<dyn QuoteSource>,
        metals: Arc<dyn QuoteSource>,
    ) -> Self {
        Sources {
            regional,
            crypto,
            metals,
        }
    }

    pub fn from_config(providers: &ProvidersConfig) -> Result<Self> {
        let (sina_url, referer) = providers
            .sina
            .as_ref()
            .map_or((DEFAULT_SINA_URL, DEFAULT_SINA_REFERER), |p| {
                (p.base_url.as_str(), p.referer.as_str())
            });
        let (gecko_url, vs_currency) = providers
            .coingecko
            .as_ref()
            .map_or((DEFAULT_COINGECKO_URL, DEFAULT_VS_CURRENCY), |p| {
                (p.base_url.as_str(), p.vs_currency.as_str())
            });

        Ok(Sources::new(
            Arc::new(SinaProvider::new(sina_url, referer)?),
            Arc::new(CoinGeckoProvider::new(gecko_url, vs_currency)?),
            Arc::new(MetalsProvider::new()),
        ))
    }

    pub fn for_group(&self, key: GroupKey) -> &dyn QuoteSource {
        match key {
            GroupKey::Stocks | GroupKey::HkStocks => self.regional.as_ref(),
            GroupKey::Gold => self.metals.as_ref(),
            GroupKey::Crypto => self.crypto.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchConfig::default().into()
    }
}

impl From<FetchConfig> for FetchOptions {
    fn from(config: FetchConfig) -> Self {
        FetchOptions {
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            concurrency: config.concurrency.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub entry: SymbolEntry,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupReport {
    pub key: GroupKey,
    pub display_name: String,
    pub rows: Vec<QuoteRow>,
}

/// Outcomes for every configured symbol, in watchlist order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub groups: Vec<GroupReport>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = &QuoteRow> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }

    pub fn unavailable_count(&self) -> usize {
        self.rows().filter(|r| !r.outcome.is_success()).count()
    }
}

/// Binds every group to its key, failing on the first group no source serves.
fn resolve_groups(watchlist: &Watchlist) -> Result<Vec<(GroupKey, &WatchlistGroup)>> {
    let keys = watchlist.validate()?;
    Ok(keys.into_iter().zip(watchlist.groups()).collect())
}

async fn fetch_one(source: &dyn QuoteSource, symbol: &str, timeout: Duration) -> FetchOutcome {
    match tokio::time::timeout(timeout, source.fetch(symbol)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(source = source.name(), %symbol, "Fetch timed out after {:?}", timeout);
            FetchOutcome::Unavailable
        }
    }
}

/// Fetches all symbols of `watchlist` and returns them grouped in configured order.
///
/// Group keys are checked before anything is fetched. Per-symbol failures
/// become [`FetchOutcome::Unavailable`] and never stop the run. `on_fetched`
/// is called once for each completed symbol.
pub async fn aggregate(
    watchlist: &Watchlist,
    sources: &Sources,
    options: &FetchOptions,
    on_fetched: &(dyn Fn() + Sync),
) -> Result<Report> {
    let plan = resolve_groups(watchlist)?;
    info!(
        groups = plan.len(),
        symbols = watchlist.symbol_count(),
        "Fetching quotes"
    );

    let jobs = plan.iter().flat_map(|(key, group)| {
        group
            .entries
            .iter()
            .map(move |entry| (sources.for_group(*key), entry.symbol.as_str()))
    });

    // `buffered` yields in submission order, so outcomes line up with the plan.
    let outcomes: Vec<FetchOutcome> = stream::iter(jobs)
        .map(|(source, symbol)| async move {
            let outcome = fetch_one(source, symbol, options.timeout).await;
            debug!(source = source.name(), %symbol, %outcome, "Fetched");
            on_fetched();
            outcome
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let mut outcomes = outcomes.into_iter();
    let groups = plan
        .into_iter()
        .map(|(key, group)| GroupReport {
            key,
            display_name: group.display_name.clone(),
            rows: group
                .entries
                .iter()
                .zip(outcomes.by_ref())
                .map(|(entry, outcome)| QuoteRow {
                    entry: entry.clone(),
                    outcome,
                })
                .collect(),
        })
        .collect();

    let report = Report { groups };
    debug!(
        total = report.len(),
        unavailable = report.unavailable_count(),
        "Aggregation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Quote;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic source: known symbols answer after an optional delay, others fail.
    #[derive(Default)]
    struct StubSource {
        quotes: HashMap<String, (Quote, u64)>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn with(mut self, symbol: &str, price: f64, change: f64, delay_ms: u64) -> Self {
            self.quotes
                .insert(symbol.to_string(), (Quote::new(price, change), delay_ms));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_quote(&self, symbol: &str) -> anyhow::Result<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.quotes.get(symbol) {
                Some((quote, delay_ms)) => {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                    Ok(*quote)
                }
                None => bail!("stub has no quote for {symbol}"),
            }
        }
    }

    fn group(key: &str, symbols: &[&str]) -> WatchlistGroup {
        WatchlistGroup::new(
            key,
            &key.to_uppercase(),
            symbols.iter().map(|s| SymbolEntry::new(s, s)).collect(),
        )
    }

    fn symbols(report: &Report) -> Vec<&str> {
        report.rows().map(|r| r.entry.symbol.as_str()).collect()
    }

    fn options(concurrency: usize) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(2),
            concurrency,
        }
    }

    #[tokio::test]
    async fn test_order_is_independent_of_latency() {
        // Earlier symbols are slower, so they finish last.
        let regional = Arc::new(
            StubSource::default()
                .with("sh1", 1.0, 0.1, 60)
                .with("sh2", 2.0, 0.2, 30)
                .with("hk1", 3.0, 0.3, 0),
        );
        let crypto = Arc::new(StubSource::default().with("BTC", 4.0, 0.4, 45));
        let metals = Arc::new(StubSource::default().with("XAU", 5.0, 0.5, 0));
        let sources = Sources::new(regional.clone(), crypto.clone(), metals.clone());

        let watchlist = Watchlist::new(vec![
            group("crypto", &["BTC"]),
            group("stocks", &["sh1", "sh2"]),
            group("gold", &["XAU"]),
            group("hkstocks", &["hk1"]),
        ]);

        for concurrency in [1, 3, 16] {
            let report = aggregate(&watchlist, &sources, &options(concurrency), &|| ())
                .await
                .unwrap();
            let keys: Vec<GroupKey> = report.groups.iter().map(|g| g.key).collect();
            assert_eq!(
                keys,
                vec![
                    GroupKey::Crypto,
                    GroupKey::Stocks,
                    GroupKey::Gold,
                    GroupKey::HkStocks
                ]
            );
            assert_eq!(symbols(&report), vec!["BTC", "sh1", "sh2", "XAU", "hk1"]);
            let prices: Vec<f64> = report
                .rows()
                .filter_map(|r| r.outcome.quote().map(|q| q.price))
                .collect();
            assert_eq!(prices, vec![4.0, 1.0, 2.0, 5.0, 3.0]);
        }
        assert_eq!(regional.calls(), 9);
        assert_eq!(crypto.calls(), 3);
    }

    #[tokio::test]
    async fn test_report_covers_every_symbol_despite_failures() {
        let regional = Arc::new(StubSource::default().with("sh1", 1.0, 0.1, 0));
        let sources = Sources::new(
            regional,
            Arc::new(StubSource::default()),
            Arc::new(StubSource::default()),
        );
        let watchlist = Watchlist::new(vec![
            group("stocks", &["bad1", "sh1", "bad2"]),
            group("crypto", &["X", "Y"]),
            group("gold", &[]),
            group("hkstocks", &["bad3"]),
        ]);

        let fetched = AtomicUsize::new(0);
        let report = aggregate(&watchlist, &sources, &options(4), &|| {
            fetched.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert_eq!(report.len(), watchlist.symbol_count());
        assert_eq!(report.len(), 6);
        assert_eq!(report.unavailable_count(), 5);
        assert_eq!(fetched.load(Ordering::SeqCst), 6);
        assert_eq!(report.groups[2].rows.len(), 0);
        assert_eq!(
            report.groups[0].rows[1].outcome,
            FetchOutcome::Success(Quote::new(1.0, 0.1))
        );
    }

    #[tokio::test]
    async fn test_unknown_group_fails_before_fetching() {
        let regional = Arc::new(StubSource::default().with("sh1", 1.0, 0.1, 0));
        let sources = Sources::new(
            regional.clone(),
            Arc::new(StubSource::default()),
            Arc::new(StubSource::default()),
        );
        let watchlist = Watchlist::new(vec![
            group("stocks", &["sh1"]),
            group("bonds", &["US10Y"]),
        ]);

        let err = aggregate(&watchlist, &sources, &options(1), &|| ())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Unknown watchlist group 'bonds'"));
        assert_eq!(regional.calls(), 0);
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let regional = Arc::new(
            StubSource::default()
                .with("slow", 1.0, 0.1, 5_000)
                .with("fast", 2.0, 0.2, 0),
        );
        let sources = Sources::new(
            regional,
            Arc::new(StubSource::default()),
            Arc::new(StubSource::default()),
        );
        let watchlist = Watchlist::new(vec![group("stocks", &["slow", "fast"])]);
        let options = FetchOptions {
            timeout: Duration::from_millis(50),
            concurrency: 2,
        };

        let report = aggregate(&watchlist, &sources, &options, &|| ())
            .await
            .unwrap();
        let outcomes: Vec<FetchOutcome> = report.rows().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                FetchOutcome::Unavailable,
                FetchOutcome::Success(Quote::new(2.0, 0.2))
            ]
        );
    }

    #[tokio::test]
    async fn test_stock_crypto_gold_scenario() {
        let metals = Arc::new(MetalsProvider::with_seed(11));
        let expected_gold = MetalsProvider::with_seed(11).fetch("XAU").await;

        let sources = Sources::new(
            Arc::new(StubSource::default()),
            Arc::new(StubSource::default().with("BTC", 60000.0, 1.5, 0)),
            metals,
        );
        let watchlist = Watchlist::new(vec![
            group("stocks", &["sh600519"]),
            group("crypto", &["BTC"]),
            group("gold", &["XAU"]),
        ]);

        let report = aggregate(&watchlist, &sources, &FetchOptions::default(), &|| ())
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(symbols(&report), vec!["sh600519", "BTC", "XAU"]);
        let outcomes: Vec<FetchOutcome> = report.rows().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                FetchOutcome::Unavailable,
                FetchOutcome::Success(Quote::new(60000.0, 1.5)),
                expected_gold,
            ]
        );
        assert!(expected_gold.is_success());
    }

    #[tokio::test]
    async fn test_empty_watchlist() {
        let sources = Sources::new(
            Arc::new(StubSource::default()),
            Arc::new(StubSource::default()),
            Arc::new(StubSource::default()),
        );
        let report = aggregate(&Watchlist::new(vec![]), &sources, &options(1), &|| ())
            .await
            .unwrap();
        assert!(report.is_empty());
        assert!(report.groups.is_empty());
    }

    #[test]
    fn test_fetch_options_from_config() {
        let options = FetchOptions::from(FetchConfig {
            timeout_secs: 3,
            concurrency: 0,
        });
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert_eq!(options.concurrency, 1);

        let options = FetchOptions::from(FetchConfig {
            timeout_secs: 0,
            concurrency: 4,
        });
        assert_eq!(options.timeout, Duration::from_secs(1));
        assert_eq!(options.concurrency, 4);
    }
}
