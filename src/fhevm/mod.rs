// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! FHEVM client SDK.
//!
//! This module provides:
//! - A client session that encrypts inputs and decrypts handles through an
//!   external FHE runtime ([`FhevmClient`])
//! - A contract call marshaler that encrypts flagged arguments ([`FhevmContract`])
//! - An alloy-backed contract backend ([`AlloyContract`])
//! - EIP-712 signing for input verification and reencryption

pub mod chain;
pub mod client;
pub mod contract;
pub mod error;
pub mod evm;
pub mod helpers;
pub mod mock;
pub mod runtime;
pub mod signing;
pub mod types;

pub use chain::{ContractBackend, ContractEvent, EventListener, PendingTx, SubscriptionId, TxReceipt};
pub use client::FhevmClient;
pub use contract::{
    estimate_encrypted_gas, wait_for_transaction, EncryptedCall, FhevmContract, DEFAULT_CONFIRMATIONS,
    DEFAULT_GAS_LIMIT, DEFAULT_TX_TIMEOUT,
};
pub use error::{ChainError, FhevmError, RuntimeError};
pub use evm::{parse_abi, wallet_provider, AlloyContract};
pub use runtime::{FheInstance, FheRuntime, InstanceConfig, Keypair};
pub use signing::{signer_from_hex, WalletSigner};
pub use types::*;
