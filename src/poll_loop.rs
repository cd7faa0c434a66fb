//! # Poll Loop
//! Every interval: fetch all tracked pairs one by one, store what succeeded, sign the latest
//! prices and send them to all peers. A cycle always runs to completion before the next interval
//! is awaited, failures only ever skip work inside the current cycle.
use std::{sync::Arc, time::Duration};

use chrono::Utc;
use futures::StreamExt;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use crate::{
    attestation::AttestationBuilder,
    error::SignError,
    message_broadcaster::{BroadcastReport, Broadcaster},
    pair::TrackedPair,
    price_provider::PriceProvider,
    price_store::{PriceObservation, PriceStore},
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum BroadcastOutcome {
    /// No tracked pair has ever been fetched, there is nothing to attest to.
    NoPrices,
    SignFailed(SignError),
    Sent(BroadcastReport),
}

#[derive(Debug)]
pub struct CycleOutcome {
    pub fetched: usize,
    pub failed: usize,
    pub broadcast: BroadcastOutcome,
}

pub struct PollLoop<P: PriceProvider> {
    price_provider: P,
    price_store: Arc<PriceStore>,
    attestation_builder: AttestationBuilder,
    broadcaster: Broadcaster,
    pairs: Vec<TrackedPair>,
    interval: Duration,
    cycles_to_run: Option<usize>,
}

impl<P: PriceProvider> PollLoop<P> {
    pub fn new(
        price_provider: P,
        price_store: Arc<PriceStore>,
        attestation_builder: AttestationBuilder,
        broadcaster: Broadcaster,
        pairs: Vec<TrackedPair>,
        interval: Duration,
        cycles_to_run: Option<usize>,
    ) -> Self {
        Self {
            price_provider,
            price_store,
            attestation_builder,
            broadcaster,
            pairs,
            interval,
            cycles_to_run,
        }
    }

    async fn fetch_prices(&self) -> (usize, usize) {
        let mut fetched = 0;
        let mut failed = 0;
        for tracked in &self.pairs {
            let price = match self.price_provider.get_price(&tracked.pair).await {
                Ok(price) => price,
                Err(e) => {
                    log::error!("Skipping {} this cycle: {}", tracked.pair, e);
                    failed += 1;
                    continue;
                }
            };
            match self
                .price_store
                .put(PriceObservation::now(tracked.pair.clone(), price))
            {
                Ok(()) => fetched += 1,
                Err(e) => {
                    log::error!("Skipping {} this cycle: {}", tracked.pair, e);
                    failed += 1;
                }
            }
        }
        (fetched, failed)
    }

    /// Latest observation of every tracked pair that has one, in configuration order.
    fn latest_observations(&self) -> Vec<(u64, PriceObservation)> {
        self.pairs
            .iter()
            .filter_map(|tracked| {
                self.price_store
                    .get(&tracked.pair)
                    .map(|observation| (tracked.pair_code, observation))
            })
            .collect()
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let start_time = Utc::now().timestamp_millis();
        let (fetched, failed) = self.fetch_prices().await;
        log::info!(
            "Fetched {} of {} pairs after {}ms, {} pairs known",
            fetched,
            self.pairs.len(),
            Utc::now().timestamp_millis() - start_time,
            self.price_store.len()
        );

        let observations = self.latest_observations();
        if observations.is_empty() {
            log::warn!("No prices observed yet, skipping broadcast");
            return CycleOutcome {
                fetched,
                failed,
                broadcast: BroadcastOutcome::NoPrices,
            };
        }

        let attestation = match self.attestation_builder.build(&observations) {
            Ok(attestation) => attestation,
            Err(e) => {
                log::error!("Skipping broadcast this cycle: {}", e);
                return CycleOutcome {
                    fetched,
                    failed,
                    broadcast: BroadcastOutcome::SignFailed(e),
                };
            }
        };

        let report = self.broadcaster.broadcast(&attestation).await;
        log::info!(
            "PairCodes: {:?}, Prices: {:?}, Nonce: {}, delivered to {} of {} peers after {}ms",
            attestation.pair_codes,
            attestation.scaled_prices,
            attestation.nonce,
            report.successes.len(),
            report.attempted(),
            Utc::now().timestamp_millis() - start_time
        );
        CycleOutcome {
            fetched,
            failed,
            broadcast: BroadcastOutcome::Sent(report),
        }
    }

    /// Runs a cycle on every interval tick, the first one immediately. Without a cycle limit this
    /// never returns.
    pub async fn run(&self) {
        let mut ticker = interval(self.interval);
        // A cycle that overruns the interval pushes the schedule back instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Polling {} pairs every {}s for {} peers",
            self.pairs.len(),
            self.interval.as_secs(),
            self.broadcaster.peers().len()
        );

        IntervalStream::new(ticker)
            .take(self.cycles_to_run.unwrap_or(usize::MAX))
            .for_each(|_| async move {
                let outcome = self.run_cycle().await;
                if outcome.failed > 0 {
                    log::warn!(
                        "{} of {} pairs failed to update, serving stale prices for them",
                        outcome.failed,
                        outcome.failed + outcome.fetched
                    );
                }
                match outcome.broadcast {
                    BroadcastOutcome::NoPrices => {}
                    BroadcastOutcome::SignFailed(e) => {
                        log::warn!("Cycle ended without broadcast: {}", e)
                    }
                    BroadcastOutcome::Sent(report) => {
                        for (peer, e) in &report.failures {
                            log::warn!("Peer {} missed this cycle: {}", peer, e);
                        }
                    }
                }
            })
            .await;

        log::info!("Max cycles reached, stopping.");
    }
}
