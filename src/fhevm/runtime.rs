// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seam to the external FHE runtime.
//!
//! The runtime owns everything cryptographic: key material, ciphertext
//! production and the gateway decryption round-trip. The session only keeps
//! the [`FheInstance`] it hands back and the keypair it generated.

use std::{fmt, sync::Arc};

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use url::Url;

use super::error::RuntimeError;
use super::types::{EncryptedType, SessionConfig};

/// Parameters used to create a runtime instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub chain_id: u64,
    pub public_key: Bytes,
    pub gateway_url: Option<Url>,
    pub acl_address: Option<Address>,
    pub kms_verifier_address: Option<Address>,
}

impl InstanceConfig {
    pub fn from_session(config: &SessionConfig, public_key: Bytes) -> Self {
        Self {
            chain_id: config.chain_id,
            public_key,
            gateway_url: config.gateway_url.clone(),
            acl_address: config.acl_address,
            kms_verifier_address: config.kms_verifier_address,
        }
    }
}

/// Ephemeral per-session keypair used for reencryption.
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    pub public_key: Bytes,
    pub private_key: Bytes,
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Ciphertext produced by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub data: Bytes,
    /// Handle the ciphertext will be addressed by, when the runtime knows it.
    pub handle: Option<B256>,
}

/// Entry point of an FHE runtime.
#[async_trait]
pub trait FheRuntime: Send + Sync {
    /// Resolve the network FHE public key for `config`.
    async fn fetch_public_key(&self, config: &SessionConfig) -> Result<Bytes, RuntimeError>;

    /// Create an instance bound to one chain.
    async fn create_instance(
        &self,
        config: InstanceConfig,
    ) -> Result<Arc<dyn FheInstance>, RuntimeError>;
}

/// A configured runtime instance. Must be reentrant: sessions issue calls on
/// it concurrently without locking.
#[async_trait]
pub trait FheInstance: Send + Sync {
    fn generate_keypair(&self) -> Keypair;

    fn encrypt(&self, value: U256, encrypted_type: EncryptedType)
        -> Result<Ciphertext, RuntimeError>;

    /// Gateway round-trip for one handle.
    async fn request_decryption(
        &self,
        contract_address: Address,
        handle: B256,
        keypair: &Keypair,
    ) -> Result<U256, RuntimeError>;
}
