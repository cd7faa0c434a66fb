use async_trait::async_trait;

use crate::{error::FetchError, pair::CurrencyPair};

pub mod coinmarketcap;

pub const PRECISION_DECIMALS: u32 = 12;
pub const PRECISION_FACTOR: u64 = 10u64.pow(PRECISION_DECIMALS);

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Latest quoted price of the pair's second symbol in units of the first.
    async fn get_price(&self, pair: &CurrencyPair) -> Result<f64, FetchError>;
}
