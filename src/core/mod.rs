//! Quote model, watchlist configuration and the aggregation pipeline

pub mod aggregator;
pub mod config;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use aggregator::{FetchOptions, GroupReport, QuoteRow, Report, Sources, aggregate};
pub use config::{AppConfig, GroupKey, SymbolEntry, Watchlist, WatchlistGroup};
pub use quote::{FetchOutcome, Quote, QuoteSource};
