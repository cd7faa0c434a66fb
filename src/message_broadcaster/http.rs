use async_trait::async_trait;
use eyre::eyre;

use crate::{
    attestation::Attestation,
    error::DeliveryError,
    message_broadcaster::{PeerAddress, PeerTransport},
};

/// Posts attestations as json to each peer's url.
#[derive(Clone, Default)]
pub struct HttpPeerTransport {
    client: reqwest::Client,
}

impl HttpPeerTransport {
    pub fn new() -> HttpPeerTransport {
        HttpPeerTransport::default()
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn deliver(&self, peer: &PeerAddress, msg: &Attestation) -> Result<(), DeliveryError> {
        ::log::debug!("Sending attestation {} to {}", msg.nonce, peer);
        let response = self
            .client
            .post(&peer.url)
            .json(msg)
            .send()
            .await
            .map_err(|e| eyre!("Error sending attestation: {}", e))?;
        ::log::debug!("Response: {:?}", response);
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected(response.status().as_u16()))
        }
    }
}
