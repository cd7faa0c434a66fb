//! # Attestation
//! Bundles the latest prices of all tracked pairs with a nonce and signs them. The signature
//! covers the ssz encoding of `(pair_codes, scaled_prices, nonce)`, peers re-encode the same
//! fields to verify it.
use std::sync::Arc;

use chrono::Utc;
use ethers::types::{Address, Signature};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use ssz::Encode;
use ssz_derive::{Decode, Encode};

use crate::{
    error::SignError,
    price_provider::PRECISION_FACTOR,
    price_store::PriceObservation,
    signature_provider::SignatureProvider,
};

/// The signed part of an attestation.
#[derive(Clone, Debug, PartialEq, Eq, Decode, Encode, Serialize, Deserialize)]
pub struct AttestationPayload {
    pub pair_codes: Vec<u64>,
    pub scaled_prices: Vec<u64>,
    pub nonce: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub pair_codes: Vec<u64>,
    pub scaled_prices: Vec<u64>,
    pub nonce: u64,
    pub signature: Signature,
}

// Peers verify on their side, the oracle itself only checks its own output in tests.
#[cfg(test)]
impl Attestation {
    pub fn payload(&self) -> AttestationPayload {
        AttestationPayload {
            pair_codes: self.pair_codes.clone(),
            scaled_prices: self.scaled_prices.clone(),
            nonce: self.nonce,
        }
    }

    /// The exact bytes that were handed to the signer.
    pub fn signing_bytes(&self) -> Vec<u8> {
        self.payload().as_ssz_bytes()
    }

    pub fn verify(&self, signer: Address) -> Result<()> {
        self.signature
            .verify(
                crate::signature_provider::private_key::hash_message(&self.signing_bytes()),
                signer,
            )
            .wrap_err("Attestation signature does not match signer")
    }
}

/// Price times 10^12, truncated toward zero. Prices above u64::MAX / 10^12 (~1.8e7) saturate.
pub fn scale_price(price: f64) -> u64 {
    let scaled = price * PRECISION_FACTOR as f64;
    if scaled >= u64::MAX as f64 {
        log::warn!(
            "Price {} does not fit a {} decimal fixed point u64, saturating",
            price,
            crate::price_provider::PRECISION_DECIMALS
        );
    }
    scaled as u64
}

pub struct AttestationBuilder {
    signature_provider: Arc<dyn SignatureProvider>,
}

impl AttestationBuilder {
    pub fn new(signature_provider: Arc<dyn SignatureProvider>) -> AttestationBuilder {
        AttestationBuilder { signature_provider }
    }

    pub fn signer_address(&self) -> Address {
        self.signature_provider.get_address()
    }

    /// Builds an attestation using the current unix time in seconds as nonce. Two builds within
    /// the same second share a nonce.
    pub fn build(
        &self,
        observations: &[(u64, PriceObservation)],
    ) -> Result<Attestation, SignError> {
        let nonce = Utc::now().timestamp() as u64;
        self.build_with_nonce(observations, nonce)
    }

    pub fn build_with_nonce(
        &self,
        observations: &[(u64, PriceObservation)],
        nonce: u64,
    ) -> Result<Attestation, SignError> {
        let (pair_codes, scaled_prices): (Vec<u64>, Vec<u64>) = observations
            .iter()
            .map(|(pair_code, observation)| (*pair_code, scale_price(observation.price)))
            .unzip();
        let payload = AttestationPayload {
            pair_codes,
            scaled_prices,
            nonce,
        };

        let signature = self
            .signature_provider
            .sign(&payload.as_ssz_bytes())
            .wrap_err("Failed to sign serialized attestation payload")?;

        Ok(Attestation {
            pair_codes: payload.pair_codes,
            scaled_prices: payload.scaled_prices,
            nonce: payload.nonce,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use ssz::Decode;

    use super::*;
    use crate::{
        pair::CurrencyPair, signature_provider::private_key::PrivateKeySignatureProvider,
    };

    struct FailingSignatureProvider;

    impl SignatureProvider for FailingSignatureProvider {
        fn sign(&self, _msg: &[u8]) -> Result<Signature> {
            eyre::bail!("keystore locked")
        }

        fn get_address(&self) -> Address {
            Address::zero()
        }
    }

    fn observation(fst: &str, snd: &str, price: f64) -> PriceObservation {
        PriceObservation::now(CurrencyPair::new(fst, snd).unwrap(), price)
    }

    fn builder() -> AttestationBuilder {
        AttestationBuilder::new(Arc::new(PrivateKeySignatureProvider::random()))
    }

    #[test]
    fn scales_prices_to_twelve_decimals() {
        assert_eq!(scale_price(1.234567891234), 1234567891234);
        assert_eq!(scale_price(1.0), 1000000000000);
        assert_eq!(scale_price(250.5), 250500000000000);
        // Truncated, not rounded.
        assert_eq!(scale_price(0.0000000000019), 1);
    }

    #[test]
    fn oversized_price_saturates() {
        assert_eq!(scale_price(1e20), u64::MAX);
    }

    #[test]
    fn keeps_pair_code_and_price_order() {
        let attestation = builder()
            .build_with_nonce(
                &[
                    (7, observation("ETH", "REN", 0.00025)),
                    (1, observation("BTC", "ETH", 14.5)),
                ],
                1531233126,
            )
            .unwrap();

        assert_eq!(attestation.pair_codes, vec![7, 1]);
        assert_eq!(attestation.scaled_prices, vec![250000000, 14500000000000]);
        assert_eq!(attestation.nonce, 1531233126);
    }

    #[test]
    fn signature_verifies_over_reencoded_payload() {
        let builder = builder();
        let attestation = builder
            .build(&[(1, observation("ETH", "USD", 250.5))])
            .unwrap();

        let bytes = attestation.signing_bytes();
        let decoded = AttestationPayload::from_ssz_bytes(&bytes).unwrap();
        assert_eq!(decoded, attestation.payload());
        assert_eq!(decoded.as_ssz_bytes(), bytes);

        attestation.verify(builder.signer_address()).unwrap();
        assert!(attestation.verify(Address::zero()).is_err());
    }

    #[test]
    fn tampered_price_fails_verification() {
        let builder = builder();
        let mut attestation = builder
            .build(&[(1, observation("ETH", "USD", 250.5))])
            .unwrap();
        attestation.scaled_prices[0] += 1;
        assert!(attestation.verify(builder.signer_address()).is_err());
    }

    #[test]
    fn nonce_is_current_unix_time() {
        let before = Utc::now().timestamp() as u64;
        let attestation = builder()
            .build(&[(1, observation("ETH", "USD", 250.5))])
            .unwrap();
        let after = Utc::now().timestamp() as u64;
        assert!(attestation.nonce >= before && attestation.nonce <= after);
    }

    #[test]
    fn signer_failure_builds_nothing() {
        let builder = AttestationBuilder::new(Arc::new(FailingSignatureProvider));
        let result = builder.build(&[(1, observation("ETH", "USD", 250.5))]);
        let error = result.unwrap_err();
        assert!(error.to_string().contains("keystore locked"));
    }
}
