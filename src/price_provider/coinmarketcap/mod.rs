use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;

use crate::{
    error::FetchError,
    pair::CurrencyPair,
    price_provider::PriceProvider,
};

mod types;

pub const DEFAULT_API_URL: &str = "https://api.coinmarketcap.com";

/// Fetches prices from the coinmarketcap ticker api. The ticker of the pair's second symbol is
/// requested converted into the first, e.g. ETH/REN asks for the REN ticker with `convert=ETH`.
pub struct CoinMarketCapPriceProvider {
    client: reqwest::Client,
    api_url: String,
    // Symbol to coinmarketcap id.
    ids: HashMap<String, u32>,
    fetch_timeout: Option<Duration>,
}

impl CoinMarketCapPriceProvider {
    pub fn new(
        api_url: &str,
        ids: HashMap<String, u32>,
        fetch_timeout: Option<Duration>,
    ) -> CoinMarketCapPriceProvider {
        CoinMarketCapPriceProvider {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            ids,
            fetch_timeout,
        }
    }

    fn ticker_url(&self, pair: &CurrencyPair) -> Result<String, FetchError> {
        let id = self
            .ids
            .get(pair.snd())
            .ok_or_else(|| FetchError::UnknownSymbol(pair.snd().to_string()))?;
        Ok(format!(
            "{}/v2/ticker/{}/?convert={}",
            self.api_url,
            id,
            pair.fst()
        ))
    }

    fn request_error(pair: &CurrencyPair, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout(pair.clone())
        } else {
            FetchError::Request {
                pair: pair.clone(),
                source,
            }
        }
    }
}

#[async_trait]
impl PriceProvider for CoinMarketCapPriceProvider {
    async fn get_price(&self, pair: &CurrencyPair) -> Result<f64, FetchError> {
        let url = self.ticker_url(pair)?;
        log::debug!("Requesting ticker for {} from {}", pair, url);

        let mut request = self.client.get(&url);
        if let Some(fetch_timeout) = self.fetch_timeout {
            request = request.timeout(fetch_timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Self::request_error(pair, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                pair: pair.clone(),
                status: response.status(),
            });
        }

        let ticker: types::TickerResponse = response
            .json()
            .await
            .map_err(|e| Self::request_error(pair, e))?;
        if let Some(error) = ticker.metadata.error.as_deref() {
            log::warn!("Ticker response for {} carries error: {}", pair, error);
        }

        let price = ticker
            .data
            .quotes
            .get(pair.fst())
            .map(|quote| quote.price)
            .ok_or_else(|| FetchError::MissingQuote {
                pair: pair.clone(),
                quote: pair.fst().to_string(),
            })?;

        if !(price.is_finite() && price > 0.0) {
            return Err(FetchError::InvalidPrice {
                pair: pair.clone(),
                price,
            });
        }
        Ok(price)
    }
}
