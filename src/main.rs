mod attestation;
mod config;
mod error;
mod http_server;
mod message_broadcaster;
mod pair;
mod poll_loop;
mod price_provider;
mod price_store;
mod signature_provider;

use std::sync::Arc;

use eyre::{Result, WrapErr};

use crate::{
    attestation::AttestationBuilder,
    config::{BroadcastMode, OracleConfig},
    message_broadcaster::{
        http::HttpPeerTransport, log::LogPeerTransport, Broadcaster, PeerTransport,
    },
    poll_loop::PollLoop,
    price_provider::coinmarketcap::CoinMarketCapPriceProvider,
    price_store::PriceStore,
    signature_provider::private_key::PrivateKeySignatureProvider,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = OracleConfig::from_env().wrap_err("Failed to load configuration")?;
    log::info!(
        "Tracking {} pairs for {} peers",
        config.pairs.len(),
        config.peers.len()
    );

    let price_store = Arc::new(PriceStore::new());

    let price_provider = CoinMarketCapPriceProvider::new(
        &config.price_api_url,
        config.cmc_ids.clone(),
        config.fetch_timeout,
    );
    log::info!("Initialized price_provider");

    let signature_provider = match config.private_key.as_deref() {
        Some(private_key) => PrivateKeySignatureProvider::from_hex(private_key)?,
        None => {
            log::warn!("No private key configured, signing with a random key");
            PrivateKeySignatureProvider::random()
        }
    };
    let attestation_builder = AttestationBuilder::new(Arc::new(signature_provider));
    log::info!(
        "Initialized attestation_builder signing as {:?}",
        attestation_builder.signer_address()
    );

    let transport: Arc<dyn PeerTransport> = match config.broadcast_mode {
        BroadcastMode::Http => Arc::new(HttpPeerTransport::new()),
        BroadcastMode::Log => Arc::new(LogPeerTransport {}),
    };
    let broadcaster = Broadcaster::new(transport, config.peers.clone(), config.peer_timeout);
    log::info!("Initialized broadcaster");

    let poll_loop = PollLoop::new(
        price_provider,
        price_store.clone(),
        attestation_builder,
        broadcaster,
        config.pairs.clone(),
        config.interval,
        None,
    );
    tokio::spawn(async move { poll_loop.run().await });

    http_server::serve(price_store, config.port).await
}
