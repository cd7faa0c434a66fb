//! # Price Store
//! Latest observed price per pair. Written by the poll loop, read by the http server. Entries
//! are only ever replaced by a newer successful fetch, a failed fetch leaves the old value in
//! place.
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Utc};

use crate::{error::StoreError, pair::CurrencyPair};

#[derive(Clone, Debug, PartialEq)]
pub struct PriceObservation {
    pub pair: CurrencyPair,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn now(pair: CurrencyPair, price: f64) -> PriceObservation {
        PriceObservation {
            pair,
            price,
            observed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PriceStore {
    prices: RwLock<HashMap<CurrencyPair, PriceObservation>>,
}

impl PriceStore {
    pub fn new() -> PriceStore {
        PriceStore::default()
    }

    /// Replaces the observation for its pair. Observations are swapped whole while holding the
    /// write lock, readers see either the old or the new one.
    pub fn put(&self, observation: PriceObservation) -> Result<(), StoreError> {
        if !(observation.price.is_finite() && observation.price > 0.0) {
            return Err(StoreError::InvalidPrice {
                pair: observation.pair,
                price: observation.price,
            });
        }
        // Inserts can't be observed half done, a poisoned map is still consistent.
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(observation.pair.clone(), observation);
        Ok(())
    }

    pub fn get(&self, pair: &CurrencyPair) -> Option<PriceObservation> {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        prices.get(pair).cloned()
    }

    pub fn len(&self) -> usize {
        self.prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
