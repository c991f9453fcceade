// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! [`ContractBackend`] over an alloy provider and a dynamic ABI.
//!
//! ## Events
//!
//! Each listener gets its own polling task. The task reads the chain head as
//! soon as it is spawned, then repeatedly fetches logs for the event topic
//! from the block after the last one seen, decodes them against the ABI and
//! hands them to the listener. `unsubscribe` cancels the task's token; tasks
//! also stop when the contract is dropped. Subscribing outside a tokio
//! runtime fails with [`ChainError::Subscription`].

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use alloy::{
    contract::{ContractInstance, Interface},
    dyn_abi::{DynSolValue, EventExt},
    json_abi::{Event, JsonAbi},
    network::{Ethereum, EthereumWallet},
    primitives::Address,
    providers::{Provider, ProviderBuilder},
    rpc::types::{Filter, Log, TransactionReceipt},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::chain::{
    ContractBackend, ContractEvent, EventListener, PendingTx, SubscriptionId, TxReceipt,
};
use super::error::ChainError;
use super::helpers::parse_contract_error;
use super::types::TransactionOptions;

/// Default poll interval for event subscriptions.
pub const DEFAULT_EVENT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Parse human-readable signatures (`function owner() view returns (address)`)
/// into an ABI.
pub fn parse_abi<'a>(signatures: impl IntoIterator<Item = &'a str>) -> Result<JsonAbi, ChainError> {
    JsonAbi::parse(signatures).map_err(|e| ChainError::Abi(e.to_string()))
}

/// HTTP provider that signs transactions with `signer`.
pub fn wallet_provider(rpc_url: Url, signer: PrivateKeySigner) -> impl Provider + Clone + 'static {
    ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url)
}

/// Map an alloy contract error, keeping revert reasons readable.
fn classify(error: alloy::contract::Error) -> ChainError {
    match error {
        alloy::contract::Error::UnknownFunction(name) => ChainError::UnknownFunction(name),
        alloy::contract::Error::AbiError(e) => ChainError::Abi(e.to_string()),
        other => {
            let message = other.to_string();
            if message.contains("revert") {
                ChainError::Reverted(parse_contract_error(&message))
            } else {
                ChainError::Rpc(message)
            }
        }
    }
}

fn to_receipt(receipt: &TransactionReceipt) -> TxReceipt {
    TxReceipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or(0),
        gas_used: receipt.gas_used,
        success: receipt.status(),
    }
}

type Subscriptions = HashMap<String, Vec<(SubscriptionId, CancellationToken)>>;

/// A deployed contract reached through an alloy provider.
pub struct AlloyContract<P> {
    instance: ContractInstance<P, Ethereum>,
    provider: P,
    poll_interval: Duration,
    subscriptions: Mutex<Subscriptions>,
}

impl<P: Provider + Clone + 'static> AlloyContract<P> {
    pub fn new(address: Address, abi: JsonAbi, provider: P) -> Self {
        let instance = ContractInstance::new(address, provider.clone(), Interface::new(abi));
        Self {
            instance,
            provider,
            poll_interval: DEFAULT_EVENT_POLL_INTERVAL,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn abi(&self) -> &JsonAbi {
        self.instance.abi()
    }

    fn event(&self, name: &str) -> Result<Event, ChainError> {
        self.abi()
            .event(name)
            .and_then(|overloads| overloads.first())
            .cloned()
            .ok_or_else(|| ChainError::UnknownEvent(name.to_string()))
    }
}

#[async_trait]
impl<P: Provider + Clone + 'static> ContractBackend for AlloyContract<P> {
    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn send(
        &self,
        function: &str,
        args: &[DynSolValue],
        options: &TransactionOptions,
    ) -> Result<PendingTx, ChainError> {
        let mut call = self.instance.function(function, args).map_err(classify)?;
        if let Some(gas) = options.gas_limit {
            call = call.gas(gas);
        }
        if let Some(gas_price) = options.gas_price {
            call = call.gas_price(gas_price);
        }
        if let Some(nonce) = options.nonce {
            call = call.nonce(nonce);
        }
        if let Some(value) = options.value {
            call = call.value(value);
        }

        let pending = call.send().await.map_err(classify)?;
        let tx_hash = *pending.tx_hash();

        tracing::debug!(
            contract = %self.address(),
            function,
            tx_hash = %tx_hash,
            "Submitted contract call"
        );

        Ok(PendingTx::new(tx_hash, move |confirmations| {
            async move {
                let receipt = pending
                    .with_required_confirmations(confirmations)
                    .get_receipt()
                    .await
                    .map_err(|e| ChainError::Receipt(e.to_string()))?;

                Ok(to_receipt(&receipt))
            }
            .boxed()
        }))
    }

    async fn call(
        &self,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ChainError> {
        self.instance
            .function(function, args)
            .map_err(classify)?
            .call()
            .await
            .map_err(classify)
    }

    async fn estimate_gas(&self, function: &str, args: &[DynSolValue]) -> Result<u64, ChainError> {
        self.instance
            .function(function, args)
            .map_err(classify)?
            .estimate_gas()
            .await
            .map_err(classify)
    }

    fn subscribe(
        &self,
        event: &str,
        listener: EventListener,
    ) -> Result<SubscriptionId, ChainError> {
        let definition = self.event(event)?;
        let runtime = Handle::try_current()
            .map_err(|e| ChainError::Subscription(format!("No tokio runtime: {e}")))?;
        let id = SubscriptionId::new();
        let token = CancellationToken::new();

        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|e| ChainError::Subscription(e.to_string()))?;

        let poller = EventPoller {
            provider: self.provider.clone(),
            address: self.address(),
            event: definition,
            listener,
            poll_interval: self.poll_interval,
        };
        runtime.spawn(poller.run(token.clone()));

        subscriptions
            .entry(event.to_string())
            .or_default()
            .push((id, token));
        drop(subscriptions);

        tracing::debug!(contract = %self.address(), event, subscription = %id, "Subscribed to event");
        Ok(id)
    }

    fn unsubscribe(&self, event: &str, id: Option<SubscriptionId>) -> usize {
        let Ok(mut subscriptions) = self.subscriptions.lock() else {
            return 0;
        };
        let Some(registered) = subscriptions.get_mut(event) else {
            return 0;
        };

        let mut removed = 0;
        registered.retain(|(existing, token)| {
            let matches = id.is_none_or(|id| id == *existing);
            if matches {
                token.cancel();
                removed += 1;
            }
            !matches
        });
        if registered.is_empty() {
            subscriptions.remove(event);
        }
        removed
    }
}

impl<P> Drop for AlloyContract<P> {
    fn drop(&mut self) {
        if let Ok(subscriptions) = self.subscriptions.lock() {
            for (_, token) in subscriptions.values().flatten() {
                token.cancel();
            }
        }
    }
}

/// Background task delivering one event to one listener.
struct EventPoller<P> {
    provider: P,
    address: Address,
    event: Event,
    listener: EventListener,
    poll_interval: Duration,
}

impl<P: Provider + Clone + 'static> EventPoller<P> {
    async fn run(self, shutdown: CancellationToken) {
        // Logs mined after subscription but before the first tick must still
        // be delivered.
        let mut next_block = tokio::select! {
            head = self.head() => match head {
                Ok(head) => Some(head + 1),
                Err(e) => {
                    tracing::warn!(event = %self.event.name, error = %e, "Failed to read chain head, seeding on next poll");
                    None
                }
            },
            _ = shutdown.cancelled() => return,
        };

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::debug!(event = %self.event.name, "Event poller shutting down");
                    return;
                }
            }

            match self.poll_step(next_block).await {
                Ok(next) => next_block = Some(next),
                Err(e) => {
                    tracing::warn!(event = %self.event.name, error = %e, "Event poll failed, will retry");
                }
            }
        }
    }

    async fn head(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Deliver logs from `from` up to the head. Without a starting block the
    /// step only records the head. Returns the next block to start from.
    async fn poll_step(&self, from: Option<u64>) -> Result<u64, ChainError> {
        let head = self.head().await?;

        let Some(from) = from else {
            return Ok(head + 1);
        };
        if from > head {
            return Ok(from);
        }

        let filter = Filter::new()
            .address(self.address)
            .event_signature(self.event.selector())
            .from_block(from)
            .to_block(head);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        for log in &logs {
            match self.decode(log) {
                Ok(event) => (self.listener)(event),
                Err(e) => tracing::warn!(event = %self.event.name, error = %e, "Skipping undecodable log"),
            }
        }

        Ok(head + 1)
    }

    fn decode(&self, log: &Log) -> Result<ContractEvent, ChainError> {
        let decoded = self
            .event
            .decode_log(log.data())
            .map_err(|e| ChainError::Abi(e.to_string()))?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let args = self
            .event
            .inputs
            .iter()
            .filter_map(|input| {
                if input.indexed {
                    indexed.next()
                } else {
                    body.next()
                }
            })
            .collect();

        Ok(ContractEvent {
            name: self.event.name.clone(),
            address: log.address(),
            args,
            block_number: log.block_number,
            tx_hash: log.transaction_hash,
        })
    }
}
