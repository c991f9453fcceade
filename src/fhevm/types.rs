// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared value types: encrypted types, inputs, requests and session config.

use std::{fmt, str::FromStr, sync::Arc};

use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use super::error::FhevmError;
use super::signing::WalletSigner;

/// Network configuration for an FHEVM-enabled chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Gateway endpoint, when the network runs one
    pub gateway_url: Option<&'static str>,
    /// Block explorer URL
    pub explorer_url: Option<&'static str>,
}

/// Sepolia testnet configuration.
pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Sepolia Testnet",
    chain_id: 11155111,
    rpc_url: "https://sepolia.infura.io/v3",
    gateway_url: None,
    explorer_url: Some("https://sepolia.etherscan.io"),
};

/// Local development node configuration.
pub const LOCALHOST: NetworkConfig = NetworkConfig {
    name: "Localhost",
    chain_id: 31337,
    rpc_url: "http://localhost:8545",
    gateway_url: None,
    explorer_url: None,
};

/// Look up a predefined network by key (`sepolia`, `localhost`).
pub fn network_by_name(raw: &str) -> Option<NetworkConfig> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "sepolia" => Some(SEPOLIA),
        "localhost" => Some(LOCALHOST),
        _ => None,
    }
}

/// Encrypted integer types supported by FHEVM contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EncryptedType {
    Ebool,
    Euint8,
    Euint16,
    Euint32,
    Euint64,
    Euint128,
    Euint256,
}

impl EncryptedType {
    pub const ALL: [EncryptedType; 7] = [
        EncryptedType::Ebool,
        EncryptedType::Euint8,
        EncryptedType::Euint16,
        EncryptedType::Euint32,
        EncryptedType::Euint64,
        EncryptedType::Euint128,
        EncryptedType::Euint256,
    ];

    /// Declared bit width.
    pub const fn bits(self) -> usize {
        match self {
            EncryptedType::Ebool => 1,
            EncryptedType::Euint8 => 8,
            EncryptedType::Euint16 => 16,
            EncryptedType::Euint32 => 32,
            EncryptedType::Euint64 => 64,
            EncryptedType::Euint128 => 128,
            EncryptedType::Euint256 => 256,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EncryptedType::Ebool => "ebool",
            EncryptedType::Euint8 => "euint8",
            EncryptedType::Euint16 => "euint16",
            EncryptedType::Euint32 => "euint32",
            EncryptedType::Euint64 => "euint64",
            EncryptedType::Euint128 => "euint128",
            EncryptedType::Euint256 => "euint256",
        }
    }

    /// Largest plaintext this type accepts (`2^bits - 1`).
    pub fn max_value(self) -> U256 {
        match self.bits() {
            256 => U256::MAX,
            bits => (U256::from(1u8) << bits) - U256::from(1u8),
        }
    }

    /// Check that `value` fits this type.
    pub fn validate(self, value: U256) -> Result<(), FhevmError> {
        if value > self.max_value() {
            return Err(FhevmError::InvalidValue(format!(
                "Value {value} exceeds maximum for {self}: {}",
                self.max_value()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for EncryptedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptedType {
    type Err = FhevmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| FhevmError::UnsupportedType(raw.to_string()))
    }
}

/// A plaintext to encrypt for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionInput {
    pub value: U256,
    pub encrypted_type: EncryptedType,
    pub contract_address: Address,
    /// Overrides the signer's address as the authorized user.
    pub user_address: Option<Address>,
}

impl EncryptionInput {
    pub fn new(value: U256, encrypted_type: EncryptedType, contract_address: Address) -> Self {
        Self {
            value,
            encrypted_type,
            contract_address,
            user_address: None,
        }
    }

    pub fn for_user(mut self, user: Address) -> Self {
        self.user_address = Some(user);
        self
    }
}

/// Ciphertext plus the signature authorizing the contract to accept it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedResult {
    pub data: Bytes,
    pub signature: Bytes,
    /// Ciphertext handle, when the runtime reports one.
    pub handle: Option<B256>,
}

/// Handles to decrypt, all owned by one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionRequest {
    pub contract_address: Address,
    pub handles: Vec<B256>,
}

/// One decrypted handle with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionResult {
    pub value: U256,
    pub handle: B256,
    pub timestamp: DateTime<Utc>,
}

/// Marks a positional contract argument that must be encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedIndex {
    pub index: usize,
    pub encrypted_type: EncryptedType,
}

impl EncryptedIndex {
    pub const fn new(index: usize, encrypted_type: EncryptedType) -> Self {
        Self {
            index,
            encrypted_type,
        }
    }
}

/// Optional overrides for a state-changing contract call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
    /// Native value sent with payable functions.
    pub value: Option<U256>,
}

/// Lifecycle of a session as seen by bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InitializationStatus {
    NotInitialized,
    Initializing,
    Initialized,
    Error,
}

/// Configuration of one session. Immutable once the session is created.
#[derive(Clone)]
pub struct SessionConfig {
    pub rpc_url: Option<Url>,
    pub signer: Option<Arc<dyn WalletSigner>>,
    pub chain_id: u64,
    pub gateway_url: Option<Url>,
    pub acl_address: Option<Address>,
    pub kms_verifier_address: Option<Address>,
}

impl SessionConfig {
    pub fn new(chain_id: u64) -> Self {
        Self {
            rpc_url: None,
            signer: None,
            chain_id,
            gateway_url: None,
            acl_address: None,
            kms_verifier_address: None,
        }
    }

    /// Start from a predefined network; URLs that fail to parse are left unset.
    pub fn for_network(network: &NetworkConfig) -> Self {
        let mut config = Self::new(network.chain_id);
        config.rpc_url = network.rpc_url.parse().ok();
        config.gateway_url = network.gateway_url.and_then(|u| u.parse().ok());
        config
    }

    pub fn with_rpc_url(mut self, url: Url) -> Self {
        self.rpc_url = Some(url);
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn WalletSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_gateway_url(mut self, url: Url) -> Self {
        self.gateway_url = Some(url);
        self
    }

    pub fn with_acl_address(mut self, address: Address) -> Self {
        self.acl_address = Some(address);
        self
    }

    pub fn with_kms_verifier_address(mut self, address: Address) -> Self {
        self.kms_verifier_address = Some(address);
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("rpc_url", &self.rpc_url)
            .field("signer", &self.signer.as_ref().map(|s| s.address()))
            .field("chain_id", &self.chain_id)
            .field("gateway_url", &self.gateway_url)
            .field("acl_address", &self.acl_address)
            .field("kms_verifier_address", &self.kms_verifier_address)
            .finish()
    }
}
