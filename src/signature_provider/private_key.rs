use ethers::{
    signers::{LocalWallet, Signer},
    types::{Address, Signature, H256},
};
use eyre::{Result, WrapErr};
use sha3::{Digest, Keccak256};

use crate::signature_provider::SignatureProvider;

pub struct PrivateKeySignatureProvider {
    wallet: LocalWallet,
}

impl PrivateKeySignatureProvider {
    pub fn random() -> PrivateKeySignatureProvider {
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        log::debug!(
            "Generated random private key associated with address: {:?}",
            wallet.address()
        );
        PrivateKeySignatureProvider { wallet }
    }

    /// Loads a hex encoded secp256k1 key, with or without 0x prefix.
    pub fn from_hex(private_key: &str) -> Result<PrivateKeySignatureProvider> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .wrap_err("Failed to parse private key")?;
        Ok(PrivateKeySignatureProvider { wallet })
    }
}

pub fn hash_message(msg: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(msg))
}

impl SignatureProvider for PrivateKeySignatureProvider {
    fn sign(&self, msg: &[u8]) -> Result<Signature> {
        let msg_hash = hash_message(msg);
        self.wallet
            .sign_hash(msg_hash)
            .wrap_err("Failed to sign message hash")
    }

    fn get_address(&self) -> Address {
        self.wallet.address()
    }
}
