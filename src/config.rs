//! # Config
//! Startup configuration: environment variables plus two json files, the tracked currencies and
//! pairs, and the per network bootstrap peers and signing key.
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    time::Duration,
};

use eyre::{Result, WrapErr};
use serde::Deserialize;

use crate::{
    message_broadcaster::{PeerAddress, DEFAULT_PEER_TIMEOUT},
    pair::{CurrencyPair, TrackedPair},
    poll_loop::DEFAULT_INTERVAL,
    price_provider::coinmarketcap::DEFAULT_API_URL,
};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CURRENCIES_PATH: &str = "currencies/currencies.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrenciesFile {
    pub currencies: Vec<Currency>,
    pub pairs: Vec<Pair>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub symbol: String,
    #[serde(rename = "cmcID")]
    pub cmc_id: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub fst_symbol: String,
    pub snd_symbol: String,
    pub pair_code: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFile {
    pub bootstrap_peers: Vec<PeerAddress>,
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastMode {
    Http,
    Log,
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub port: u16,
    pub interval: Duration,
    pub price_api_url: String,
    pub fetch_timeout: Option<Duration>,
    pub peer_timeout: Duration,
    pub broadcast_mode: BroadcastMode,
    pub cmc_ids: HashMap<String, u32>,
    pub pairs: Vec<TrackedPair>,
    pub peers: Vec<PeerAddress>,
    pub private_key: Option<String>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot load config file {}", path.display()))?;
    serde_json::from_str(&file)
        .wrap_err_with(|| format!("cannot unmarshal config file {}", path.display()))
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<Duration> {
    let value = lookup(var)?;
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            log::warn!("Ignoring invalid {}={:?}, using default", var, value);
            None
        }
    }
}

impl OracleConfig {
    pub fn from_env() -> Result<OracleConfig> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup` instead of the process environment. Relative file
    /// paths resolve against the working directory.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<OracleConfig> {
        let network = lookup("NETWORK").ok_or_else(|| eyre::eyre!("NETWORK is not set"))?;
        let currencies_path = PathBuf::from(
            lookup("CURRENCIES_PATH").unwrap_or_else(|| DEFAULT_CURRENCIES_PATH.to_string()),
        );
        let network_path = lookup("NETWORK_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("env/{}/config.json", network)));

        let port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .wrap_err_with(|| format!("invalid PORT {:?}", port))?,
            None => DEFAULT_PORT,
        };
        let broadcast_mode = match lookup("BROADCAST_MODE").as_deref() {
            None | Some("http") => BroadcastMode::Http,
            Some("log") => BroadcastMode::Log,
            Some(other) => eyre::bail!("unknown BROADCAST_MODE {:?}, expected http or log", other),
        };

        let currencies: CurrenciesFile = read_json(&currencies_path)?;
        let network_file: NetworkFile = read_json(&network_path)?;
        let cmc_ids: HashMap<String, u32> = currencies
            .currencies
            .iter()
            .map(|currency| (currency.symbol.clone(), currency.cmc_id))
            .collect();
        let pairs = tracked_pairs(&currencies.pairs, &cmc_ids)?;

        Ok(OracleConfig {
            port,
            interval: parse_secs(&lookup, "INTERVAL").unwrap_or(DEFAULT_INTERVAL),
            price_api_url: lookup("PRICE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            fetch_timeout: parse_secs(&lookup, "FETCH_TIMEOUT"),
            peer_timeout: parse_secs(&lookup, "PEER_TIMEOUT").unwrap_or(DEFAULT_PEER_TIMEOUT),
            broadcast_mode,
            cmc_ids,
            pairs,
            peers: network_file.bootstrap_peers,
            private_key: network_file.private_key,
        })
    }
}

/// Prices are requested by the id of the pair's second symbol, so it must have one.
fn tracked_pairs(pairs: &[Pair], cmc_ids: &HashMap<String, u32>) -> Result<Vec<TrackedPair>> {
    let mut pair_codes = HashSet::new();
    pairs
        .iter()
        .map(|pair| {
            if !pair_codes.insert(pair.pair_code) {
                eyre::bail!("duplicate pair code {}", pair.pair_code)
            }
            cmc_ids
                .get(&pair.snd_symbol)
                .ok_or_else(|| eyre::eyre!("no cmcID for symbol {}", pair.snd_symbol))
                .wrap_err_with(|| format!("invalid pair with code {}", pair.pair_code))?;
            Ok(TrackedPair {
                pair: CurrencyPair::new(&pair.fst_symbol, &pair.snd_symbol)
                    .wrap_err_with(|| format!("invalid pair with code {}", pair.pair_code))?,
                pair_code: pair.pair_code,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENCIES: &str = r#"{
        "currencies": [
            {"symbol": "ETH", "cmcID": 1027},
            {"symbol": "REN", "cmcID": 2539}
        ],
        "pairs": [
            {"fstSymbol": "ETH", "sndSymbol": "REN", "pairCode": 65536}
        ]
    }"#;

    const NETWORK: &str = r#"{
        "bootstrapPeers": [
            {"id": "bootstrap-1", "url": "http://127.0.0.1:18514/midpoint"}
        ]
    }"#;

    fn write_files(name: &str, currencies: &str) -> (PathBuf, PathBuf) {
        let dir =
            std::env::temp_dir().join(format!("price-oracle-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let currencies_path = dir.join("currencies.json");
        let network_path = dir.join("config.json");
        std::fs::write(&currencies_path, currencies).unwrap();
        std::fs::write(&network_path, NETWORK).unwrap();
        (currencies_path, network_path)
    }

    fn lookup_with(vars: Vec<(&'static str, String)>) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&'static str, String> = vars.into_iter().collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn loads_files_and_defaults() {
        let (currencies_path, network_path) = write_files("defaults", CURRENCIES);
        let config = OracleConfig::from_lookup(lookup_with(vec![
            ("NETWORK", "testnet".to_string()),
            ("CURRENCIES_PATH", currencies_path.display().to_string()),
            ("NETWORK_CONFIG_PATH", network_path.display().to_string()),
        ]))
        .unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.peer_timeout, DEFAULT_PEER_TIMEOUT);
        assert_eq!(config.fetch_timeout, None);
        assert_eq!(config.broadcast_mode, BroadcastMode::Http);
        assert_eq!(config.cmc_ids["REN"], 2539);
        assert_eq!(
            config.pairs,
            vec![TrackedPair {
                pair: CurrencyPair::new("ETH", "REN").unwrap(),
                pair_code: 65536
            }]
        );
        assert_eq!(config.peers[0].id, "bootstrap-1");
        assert!(config.private_key.is_none());
    }

    #[test]
    fn unparsable_interval_falls_back_to_default() {
        let (currencies_path, network_path) = write_files("interval", CURRENCIES);
        let config = OracleConfig::from_lookup(lookup_with(vec![
            ("NETWORK", "testnet".to_string()),
            ("CURRENCIES_PATH", currencies_path.display().to_string()),
            ("NETWORK_CONFIG_PATH", network_path.display().to_string()),
            ("INTERVAL", "soon".to_string()),
            ("FETCH_TIMEOUT", "3".to_string()),
            ("PEER_TIMEOUT", "2".to_string()),
            ("BROADCAST_MODE", "log".to_string()),
        ]))
        .unwrap();

        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.peer_timeout, Duration::from_secs(2));
        assert_eq!(config.broadcast_mode, BroadcastMode::Log);
    }

    #[test]
    fn missing_network_is_fatal() {
        assert!(OracleConfig::from_lookup(lookup_with(vec![])).is_err());
    }

    #[test]
    fn duplicate_pair_codes_are_rejected() {
        let currencies = r#"{
            "currencies": [
                {"symbol": "REN", "cmcID": 2539},
                {"symbol": "DGX", "cmcID": 2739}
            ],
            "pairs": [
                {"fstSymbol": "ETH", "sndSymbol": "REN", "pairCode": 1},
                {"fstSymbol": "ETH", "sndSymbol": "DGX", "pairCode": 1}
            ]
        }"#;
        let (currencies_path, network_path) = write_files("duplicates", currencies);
        let error = OracleConfig::from_lookup(lookup_with(vec![
            ("NETWORK", "testnet".to_string()),
            ("CURRENCIES_PATH", currencies_path.display().to_string()),
            ("NETWORK_CONFIG_PATH", network_path.display().to_string()),
        ]))
        .unwrap_err();
        assert!(format!("{:#}", error).contains("duplicate pair code 1"));
    }

    #[test]
    fn pair_without_cmc_id_is_rejected() {
        let currencies = r#"{
            "currencies": [{"symbol": "REN", "cmcID": 2539}],
            "pairs": [
                {"fstSymbol": "ETH", "sndSymbol": "REN", "pairCode": 1},
                {"fstSymbol": "ETH", "sndSymbol": "OMG", "pairCode": 2}
            ]
        }"#;
        let (currencies_path, network_path) = write_files("cmc-ids", currencies);
        let error = OracleConfig::from_lookup(lookup_with(vec![
            ("NETWORK", "testnet".to_string()),
            ("CURRENCIES_PATH", currencies_path.display().to_string()),
            ("NETWORK_CONFIG_PATH", network_path.display().to_string()),
        ]))
        .unwrap_err();
        assert!(format!("{:#}", error).contains("no cmcID for symbol OMG"));
    }
}
