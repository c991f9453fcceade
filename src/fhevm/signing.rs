// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EIP-712 signatures for encrypted inputs and reencryption requests.
//!
//! Two domains are used and must match the contract-side verifier exactly:
//!
//! | Purpose | Domain name | Payload |
//! |---------|-------------|---------|
//! | Input verification | `FHEVMInputVerifier` | `EncryptedInput { bytes data; address user; }` |
//! | Reencryption | `FHEVMReencryption` | `Reencryption { bytes publicKey; bytes32 handle; }` |
//!
//! Both use version `1` and bind the chain id and the verifying contract, so
//! an input signature can never be replayed as a reencryption signature.

use std::borrow::Cow;

use alloy::{
    primitives::{Address, Bytes, Signature, B256, U256},
    signers::{local::PrivateKeySigner, Signer, SignerSync},
    sol,
    sol_types::{Eip712Domain, SolStruct},
};
use async_trait::async_trait;

use super::error::FhevmError;

sol! {
    /// Ciphertext bound to the user allowed to submit it.
    #[derive(Debug, PartialEq, Eq)]
    struct EncryptedInput {
        bytes data;
        address user;
    }

    /// Request to reencrypt a handle under the session public key.
    #[derive(Debug, PartialEq, Eq)]
    struct Reencryption {
        bytes publicKey;
        bytes32 handle;
    }
}

/// Domain name for input-verification signatures.
pub const INPUT_VERIFIER_DOMAIN: &str = "FHEVMInputVerifier";

/// Domain name for reencryption signatures.
pub const REENCRYPTION_DOMAIN: &str = "FHEVMReencryption";

/// Version shared by both domains.
pub const DOMAIN_VERSION: &str = "1";

/// Wallet capable of signing typed-data digests.
///
/// Implemented for alloy's [`PrivateKeySigner`]; browser or remote wallets
/// plug in by implementing it themselves.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address the signatures recover to.
    fn address(&self) -> Address;

    /// Sign a 32-byte EIP-712 digest.
    async fn sign_hash(&self, hash: &B256) -> Result<Signature, FhevmError>;
}

#[async_trait]
impl WalletSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        Signer::address(self)
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, FhevmError> {
        self.sign_hash_sync(hash)
            .map_err(|e| FhevmError::Signing(e.to_string()))
    }
}

/// Build the domain for input-verification signatures.
pub fn input_verifier_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    domain(INPUT_VERIFIER_DOMAIN, chain_id, verifying_contract)
}

/// Build the domain for reencryption signatures.
pub fn reencryption_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    domain(REENCRYPTION_DOMAIN, chain_id, verifying_contract)
}

fn domain(name: &'static str, chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(name)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(verifying_contract),
        None,
    )
}

/// Sign `payload` under `domain` and return the 65-byte `r || s || v` signature.
pub async fn sign_typed<T: SolStruct + Sync>(
    signer: &dyn WalletSigner,
    payload: &T,
    domain: &Eip712Domain,
) -> Result<Bytes, FhevmError> {
    let hash = payload.eip712_signing_hash(domain);
    let signature = signer.sign_hash(&hash).await?;
    Ok(Bytes::from(signature.as_bytes().to_vec()))
}

/// Create a signer from a hex-encoded private key (with or without `0x`).
pub fn signer_from_hex(private_key_hex: &str) -> Result<PrivateKeySigner, FhevmError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim())
        .map_err(|e| FhevmError::Signing(format!("Invalid private key: {e}")))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| FhevmError::Signing(format!("Invalid private key: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::address;

    /// Well-known development key (first account of a local dev node).
    pub(crate) const DEV_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    pub(crate) const DEV_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn signer_from_hex_accepts_prefixed_keys() {
        let signer = signer_from_hex(DEV_KEY).expect("valid key");
        assert_eq!(WalletSigner::address(&signer), DEV_ADDRESS);

        let bare = signer_from_hex(DEV_KEY.trim_start_matches("0x")).expect("valid key");
        assert_eq!(WalletSigner::address(&bare), DEV_ADDRESS);

        assert!(signer_from_hex("0x1234").is_err());
    }

    #[tokio::test]
    async fn input_signature_recovers_to_signer() {
        let signer = signer_from_hex(DEV_KEY).unwrap();
        let contract = address!("C16ebe7Cb0A3B057437B8A3568d6Df2FB02812d1");
        let payload = EncryptedInput {
            data: Bytes::from(vec![1, 2, 3]),
            user: DEV_ADDRESS,
        };
        let domain = input_verifier_domain(11155111, contract);

        let sig = sign_typed(&signer, &payload, &domain).await.unwrap();
        assert_eq!(sig.len(), 65);

        let parsed = Signature::try_from(sig.as_ref()).unwrap();
        let recovered = parsed
            .recover_address_from_prehash(&payload.eip712_signing_hash(&domain))
            .unwrap();
        assert_eq!(recovered, DEV_ADDRESS);
    }

    #[test]
    fn domains_are_distinct() {
        let contract = address!("C16ebe7Cb0A3B057437B8A3568d6Df2FB02812d1");
        let input = input_verifier_domain(1, contract);
        let reenc = reencryption_domain(1, contract);
        assert_ne!(input.separator(), reenc.separator());
        assert_eq!(input.name.as_deref(), Some(INPUT_VERIFIER_DOMAIN));
        assert_eq!(reenc.version.as_deref(), Some(DOMAIN_VERSION));

        // Chain id is part of the separator.
        assert_ne!(input.separator(), input_verifier_domain(2, contract).separator());
    }
}
