//! Failures of the polling pipeline. None of these are fatal to the process, each is recovered
//! where it happens: a failed fetch keeps the stale price, a failed signature skips the cycle's
//! broadcast and a failed delivery only affects that peer.
use thiserror::Error;

use crate::pair::CurrencyPair;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no provider id configured for symbol {0}")]
    UnknownSymbol(String),

    #[error("cannot get price information for pair {pair}: {source}")]
    Request {
        pair: CurrencyPair,
        #[source]
        source: reqwest::Error,
    },

    #[error("non-success response {status} for pair {pair}")]
    Status {
        pair: CurrencyPair,
        status: reqwest::StatusCode,
    },

    #[error("response for pair {pair} has no quote in {quote}")]
    MissingQuote { pair: CurrencyPair, quote: String },

    #[error("provider returned invalid price {price} for pair {pair}")]
    InvalidPrice { pair: CurrencyPair, price: f64 },

    #[error("timed out fetching price for pair {0}")]
    Timeout(CurrencyPair),
}

#[derive(Debug, Error)]
#[error("cannot sign attestation: {0:#}")]
pub struct SignError(#[from] pub eyre::Report);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery timed out after {0}ms")]
    Timeout(u128),

    #[error("peer rejected attestation with status {0}")]
    Rejected(u16),

    #[error("transport error: {0:#}")]
    Transport(#[from] eyre::Report),
}

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("refusing to store non-positive or non-finite price {price} for pair {pair}")]
    InvalidPrice { pair: CurrencyPair, price: f64 },
}
