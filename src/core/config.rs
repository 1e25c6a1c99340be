use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

/// Asset classes a watchlist group can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Stocks,
    HkStocks,
    Gold,
    Crypto,
}

impl GroupKey {
    pub const ALL: [GroupKey; 4] = [
        GroupKey::Stocks,
        GroupKey::HkStocks,
        GroupKey::Gold,
        GroupKey::Crypto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKey::Stocks => "stocks",
            GroupKey::HkStocks => "hkstocks",
            GroupKey::Gold => "gold",
            GroupKey::Crypto => "crypto",
        }
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GroupKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                anyhow!(
                    "Unknown watchlist group '{}': expected one of stocks, hkstocks, gold, crypto",
                    s
                )
            })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SymbolEntry {
    pub symbol: String,
    #[serde(alias = "displayName")]
    pub display_name: String,
}

impl SymbolEntry {
    pub fn new(symbol: &str, display_name: &str) -> Self {
        SymbolEntry {
            symbol: symbol.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchlistGroup {
    /// Filled from the mapping key, not from the group body.
    #[serde(skip)]
    pub key: String,
    #[serde(alias = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub entries: Vec<SymbolEntry>,
}

impl WatchlistGroup {
    pub fn new(key: &str, display_name: &str, entries: Vec<SymbolEntry>) -> Self {
        WatchlistGroup {
            key: key.to_string(),
            display_name: display_name.to_string(),
            entries,
        }
    }
}

/// Groups of symbols in configured order.
///
/// Serialized as a mapping from group key to group; the mapping order is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Watchlist {
    groups: Vec<WatchlistGroup>,
}

impl Watchlist {
    pub fn new(groups: Vec<WatchlistGroup>) -> Self {
        Watchlist { groups }
    }

    pub fn groups(&self) -> &[WatchlistGroup] {
        &self.groups
    }

    pub fn symbol_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.symbol_count() == 0
    }

    /// Resolves every group key, failing on the first one no source serves.
    pub fn validate(&self) -> Result<Vec<GroupKey>> {
        self.groups.iter().map(|g| g.key.parse::<GroupKey>()).collect()
    }

    /// Keeps only the named groups, in configured order. An empty selection keeps everything.
    pub fn select(&self, keys: &[String]) -> Result<Watchlist> {
        if keys.is_empty() {
            return Ok(self.clone());
        }
        if let Some(missing) = keys
            .iter()
            .find(|k| !self.groups.iter().any(|g| &g.key == *k))
        {
            anyhow::bail!("Group '{}' is not in the watchlist", missing);
        }

        Ok(Watchlist::new(
            self.groups
                .iter()
                .filter(|g| keys.contains(&g.key))
                .cloned()
                .collect(),
        ))
    }

    /// Overlays `self` on `base`: groups with a shared key replace the base group in place,
    /// other groups from `self` are appended.
    pub fn merged_over(self, base: Watchlist) -> Watchlist {
        let mut overrides = self.groups;
        let mut groups: Vec<WatchlistGroup> = base
            .groups
            .into_iter()
            .map(|group| {
                match overrides.iter().position(|o| o.key == group.key) {
                    Some(index) => overrides.remove(index),
                    None => group,
                }
            })
            .collect();
        groups.extend(overrides);
        Watchlist { groups }
    }
}

impl Default for Watchlist {
    /// Built-in watchlist used when no configuration file is available.
    fn default() -> Self {
        Watchlist::new(vec![
            WatchlistGroup::new(
                "stocks",
                "A股",
                vec![
                    SymbolEntry::new("sh000001", "上证指数"),
                    SymbolEntry::new("sz399001", "深证成指"),
                    SymbolEntry::new("sh600519", "贵州茅台"),
                ],
            ),
            WatchlistGroup::new(
                "hkstocks",
                "港股",
                vec![
                    SymbolEntry::new("hkHSI", "恒生指数"),
                    SymbolEntry::new("hk00700", "腾讯控股"),
                ],
            ),
            WatchlistGroup::new(
                "gold",
                "黄金",
                vec![
                    SymbolEntry::new("XAU", "伦敦金"),
                    SymbolEntry::new("AU9999", "上海金"),
                ],
            ),
            WatchlistGroup::new(
                "crypto",
                "加密货币",
                vec![
                    SymbolEntry::new("BTC", "比特币"),
                    SymbolEntry::new("ETH", "以太坊"),
                ],
            ),
        ])
    }
}

impl Serialize for Watchlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.key, group)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Watchlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WatchlistVisitor;

        impl<'de> Visitor<'de> for WatchlistVisitor {
            type Value = Watchlist;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of group keys to watchlist groups")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Watchlist, A::Error> {
                let mut groups = Vec::new();
                while let Some((key, mut group)) = map.next_entry::<String, WatchlistGroup>()? {
                    group.key = key;
                    groups.push(group);
                }
                Ok(Watchlist { groups })
            }
        }

        deserializer.deserialize_map(WatchlistVisitor)
    }
}

pub const DEFAULT_SINA_URL: &str = "https://hq.sinajs.cn";
pub const DEFAULT_SINA_REFERER: &str = "https://finance.sina.com.cn";
pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_VS_CURRENCY: &str = "cny";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SinaProviderConfig {
    pub base_url: String,
    #[serde(default = "default_referer")]
    pub referer: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
}

fn default_referer() -> String {
    DEFAULT_SINA_REFERER.to_string()
}

fn default_vs_currency() -> String {
    DEFAULT_VS_CURRENCY.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub sina: Option<SinaProviderConfig>,
    pub coingecko: Option<CoinGeckoProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            sina: Some(SinaProviderConfig {
                base_url: DEFAULT_SINA_URL.to_string(),
                referer: default_referer(),
            }),
            coingecko: Some(CoinGeckoProviderConfig {
                base_url: DEFAULT_COINGECKO_URL.to_string(),
                vs_currency: default_vs_currency(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on in-flight fetches; 1 fetches strictly one symbol at a time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_concurrency() -> usize {
    8
}

fn default_interval_secs() -> u64 {
    30
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct AppConfig {
    pub watchlist: Watchlist,
    pub providers: ProvidersConfig,
    pub fetch: FetchConfig,
    pub interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            watchlist: Watchlist::default(),
            providers: ProvidersConfig::default(),
            fetch: FetchConfig::default(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// File layout before merging; the watchlist stays partial here.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    watchlist: Option<Watchlist>,
    #[serde(default)]
    providers: ProvidersConfig,
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default = "default_interval_secs")]
    interval_secs: u64,
}

impl From<ConfigFile> for AppConfig {
    fn from(file: ConfigFile) -> Self {
        let watchlist = match file.watchlist {
            Some(user) => user.merged_over(Watchlist::default()),
            None => Watchlist::default(),
        };
        AppConfig {
            watchlist,
            providers: file.providers,
            fetch: file.fetch,
            interval_secs: file.interval_secs,
        }
    }
}

impl AppConfig {
    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "pricewatch", "pricewatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Reads a config file and merges it over the built-in defaults.
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config = Self::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Loads the given or default config file, falling back to the built-in
    /// configuration when the file is missing or invalid.
    pub fn load_or_default(path: Option<&str>) -> Self {
        let path = match path {
            Some(p) => PathBuf::from(p),
            None => match Self::default_config_path() {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "No config location available, using built-in watchlist");
                    return AppConfig::default();
                }
            },
        };

        if !path.exists() {
            debug!("No config file at {}, using built-in watchlist", path.display());
            return AppConfig::default();
        }

        Self::load_from_path(&path).unwrap_or_else(|e| {
            warn!("Ignoring invalid config ({e:#}), using built-in watchlist");
            AppConfig::default()
        })
    }
}

impl FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let file: ConfigFile = serde_yaml::from_str(s)?;
        Ok(file.into())
    }
}
