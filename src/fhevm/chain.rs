// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain-facing contract backend.
//!
//! [`ContractBackend`] is everything the marshaler needs from a deployed
//! contract: dynamic-ABI calls, transaction submission, gas estimation and an
//! event emitter. [`super::evm::AlloyContract`] implements it over an alloy
//! provider.

use std::{fmt, sync::Arc};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, TxHash},
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use super::error::ChainError;
use super::types::TransactionOptions;

/// Identifier of one event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

type ConfirmFn = Box<dyn FnOnce(u64) -> BoxFuture<'static, Result<TxReceipt, ChainError>> + Send>;

/// A submitted transaction that has not been confirmed yet.
pub struct PendingTx {
    tx_hash: TxHash,
    confirm: ConfirmFn,
}

impl PendingTx {
    /// `confirm` resolves once the transaction has the requested number of
    /// confirmations.
    pub fn new<F>(tx_hash: TxHash, confirm: F) -> Self
    where
        F: FnOnce(u64) -> BoxFuture<'static, Result<TxReceipt, ChainError>> + Send + 'static,
    {
        Self {
            tx_hash,
            confirm: Box::new(confirm),
        }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Wait for `confirmations` blocks and return the receipt.
    pub async fn confirmations(self, confirmations: u64) -> Result<TxReceipt, ChainError> {
        (self.confirm)(confirmations).await
    }
}

impl fmt::Debug for PendingTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTx")
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

/// A decoded contract event.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractEvent {
    pub name: String,
    pub address: Address,
    /// Event arguments in declaration order, indexed and non-indexed merged.
    pub args: Vec<DynSolValue>,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
}

/// Callback invoked for every matching event.
pub type EventListener = Arc<dyn Fn(ContractEvent) + Send + Sync>;

/// A deployed contract reachable through some chain connection.
#[async_trait]
pub trait ContractBackend: Send + Sync {
    fn address(&self) -> Address;

    /// Submit a state-changing call.
    async fn send(
        &self,
        function: &str,
        args: &[DynSolValue],
        options: &TransactionOptions,
    ) -> Result<PendingTx, ChainError>;

    /// Execute a read-only call and decode its outputs.
    async fn call(&self, function: &str, args: &[DynSolValue])
        -> Result<Vec<DynSolValue>, ChainError>;

    async fn estimate_gas(&self, function: &str, args: &[DynSolValue]) -> Result<u64, ChainError>;

    /// Register `listener` for `event`. Backends that deliver events from a
    /// background task fail with [`ChainError::Subscription`] outside a tokio
    /// runtime.
    fn subscribe(&self, event: &str, listener: EventListener)
        -> Result<SubscriptionId, ChainError>;

    /// Remove one listener, or every listener of `event` when `id` is `None`.
    /// Returns how many were removed.
    fn unsubscribe(&self, event: &str, id: Option<SubscriptionId>) -> usize;
}

#[async_trait]
impl<B: ContractBackend + ?Sized> ContractBackend for Arc<B> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn send(
        &self,
        function: &str,
        args: &[DynSolValue],
        options: &TransactionOptions,
    ) -> Result<PendingTx, ChainError> {
        (**self).send(function, args, options).await
    }

    async fn call(
        &self,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ChainError> {
        (**self).call(function, args).await
    }

    async fn estimate_gas(&self, function: &str, args: &[DynSolValue]) -> Result<u64, ChainError> {
        (**self).estimate_gas(function, args).await
    }

    fn subscribe(
        &self,
        event: &str,
        listener: EventListener,
    ) -> Result<SubscriptionId, ChainError> {
        (**self).subscribe(event, listener)
    }

    fn unsubscribe(&self, event: &str, id: Option<SubscriptionId>) -> usize {
        (**self).unsubscribe(event, id)
    }
}
