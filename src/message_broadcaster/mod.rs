//! # Message Broadcaster
//! Sends one attestation to every bootstrap peer at once. Every delivery gets its own timeout, a
//! slow or unreachable peer only costs its own attempt. There are no retries, the next cycle sends
//! a fresh attestation anyway.
use std::{fmt::Display, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::{attestation::Attestation, error::DeliveryError};

pub mod http;
pub mod log;

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    pub id: String,
    pub url: String,
}

impl Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn deliver(&self, peer: &PeerAddress, msg: &Attestation) -> Result<(), DeliveryError>;
}

#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub successes: Vec<String>,
    pub failures: Vec<(String, DeliveryError)>,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

pub struct Broadcaster {
    transport: Arc<dyn PeerTransport>,
    peers: Vec<PeerAddress>,
    peer_timeout: Duration,
}

impl Broadcaster {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        peers: Vec<PeerAddress>,
        peer_timeout: Duration,
    ) -> Broadcaster {
        Broadcaster {
            transport,
            peers,
            peer_timeout,
        }
    }

    pub fn peers(&self) -> &[PeerAddress] {
        &self.peers
    }

    async fn deliver_to(
        &self,
        peer: &PeerAddress,
        msg: &Attestation,
    ) -> Result<(), DeliveryError> {
        timeout(self.peer_timeout, self.transport.deliver(peer, msg))
            .await
            .unwrap_or_else(|_| Err(DeliveryError::Timeout(self.peer_timeout.as_millis())))
    }

    /// Returns once every peer has succeeded, failed or timed out. Outcomes are reported in peer
    /// order.
    pub async fn broadcast(&self, msg: &Attestation) -> BroadcastReport {
        let outcomes = join_all(self.peers.iter().map(|peer| self.deliver_to(peer, msg))).await;

        let mut report = BroadcastReport::default();
        for (peer, outcome) in self.peers.iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    ::log::debug!("Delivered attestation {} to {}", msg.nonce, peer);
                    report.successes.push(peer.id.clone());
                }
                Err(e) => {
                    ::log::warn!("Cannot deliver attestation {} to {}: {}", msg.nonce, peer, e);
                    report.failures.push((peer.id.clone(), e));
                }
            }
        }
        report
    }
}
