use async_trait::async_trait;

use crate::{
    attestation::Attestation,
    error::DeliveryError,
    message_broadcaster::{PeerAddress, PeerTransport},
};

/// Dry run transport, logs what would have been sent.
pub struct LogPeerTransport {}

#[async_trait]
impl PeerTransport for LogPeerTransport {
    async fn deliver(&self, peer: &PeerAddress, msg: &Attestation) -> Result<(), DeliveryError> {
        ::log::info!("Broadcasting attestation to {}: {:?}", peer, msg);
        Ok(())
    }
}
