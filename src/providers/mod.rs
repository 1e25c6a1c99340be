pub mod coingecko;
pub mod metals;
pub mod sina;

pub use coingecko::CoinGeckoProvider;
pub use metals::MetalsProvider;
pub use sina::SinaProvider;
