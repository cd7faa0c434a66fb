use std::fmt::Display;

use eyre::Result;

/// An ordered pair of tickers, e.g. ETH/REN: the price of the second symbol expressed in the
/// first. Order matters, ETH/REN and REN/ETH are different pairs. Symbols are non-empty, uppercase
/// and ascii alphanumeric.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    fst: String,
    snd: String,
}

impl CurrencyPair {
    pub fn new(fst: &str, snd: &str) -> Result<CurrencyPair> {
        for symbol in [fst, snd] {
            if !is_valid_symbol(symbol) {
                eyre::bail!(
                    "invalid symbol {:?}, expected a non-empty uppercase ticker",
                    symbol
                )
            }
        }
        Ok(CurrencyPair {
            fst: fst.to_string(),
            snd: snd.to_string(),
        })
    }

    pub fn fst(&self) -> &str {
        &self.fst
    }

    pub fn snd(&self) -> &str {
        &self.snd
    }
}

/// A pair the oracle polls, with the code identifying it in attestations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedPair {
    pub pair: CurrencyPair,
    pub pair_code: u64,
}

fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.fst, self.snd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_matters() {
        let eth_usd = CurrencyPair::new("ETH", "USD").unwrap();
        let usd_eth = CurrencyPair::new("USD", "ETH").unwrap();
        assert_ne!(eth_usd, usd_eth);
        assert_eq!(eth_usd, CurrencyPair::new("ETH", "USD").unwrap());
        assert_eq!(eth_usd.to_string(), "ETH/USD");
    }

    #[test]
    fn rejects_malformed_symbols() {
        assert!(CurrencyPair::new("", "USD").is_err());
        assert!(CurrencyPair::new("eth", "USD").is_err());
        assert!(CurrencyPair::new("ETH", "US D").is_err());
        assert!(CurrencyPair::new("1INCH", "DAI").is_ok());
    }
}
