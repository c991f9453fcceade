// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the SDK.
//!
//! Validation errors are raised before any runtime or chain call is made.
//! External failures are wrapped only to classify them; their message is
//! carried verbatim.

use std::time::Duration;

use alloy::primitives::TxHash;

/// Errors reported by the chain-facing contract backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Unknown contract function: {0}")]
    UnknownFunction(String),

    #[error("Unknown contract event: {0}")]
    UnknownEvent(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Execution reverted: {0}")]
    Reverted(String),

    #[error("Receipt error: {0}")]
    Receipt(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),
}

/// Errors reported by an external FHE runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Invalid runtime configuration: {0}")]
    InvalidConfig(String),

    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

/// Errors surfaced by the session, marshaler and bindings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FhevmError {
    #[error("Failed to initialize FHEVM instance: {0}")]
    Initialization(String),

    #[error("FHEVM instance not initialized. Call initialize() first.")]
    NotInitialized,

    #[error("User address required for encryption")]
    MissingAddress,

    #[error("Signer required for signature generation")]
    MissingSigner,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported encrypted type: {0}")]
    UnsupportedType(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Transaction {tx_hash} not confirmed within {timeout:?}")]
    TransactionTimeout { tx_hash: TxHash, timeout: Duration },

    #[error("Transaction {0} failed")]
    TransactionFailed(TxHash),

    #[error("Session was reset while the operation was in flight")]
    SessionReset,
}
