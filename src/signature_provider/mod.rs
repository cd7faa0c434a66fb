use ethers::types::{Address, Signature};
use eyre::Result;

pub mod private_key;

pub trait SignatureProvider: Send + Sync {
    /// Signs the keccak256 hash of `msg`.
    fn sign(&self, msg: &[u8]) -> Result<Signature>;
    fn get_address(&self) -> Address;
}
