// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process collaborators for tests and demos.
//!
//! [`MockRuntime`] produces masked plaintexts, not real FHE. Every encryption
//! is recorded under `keccak256(ciphertext)` so a later decryption of that
//! handle round-trips the original value. [`MockContract`] records submitted
//! calls, serves canned view outputs and emits events synchronously.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{keccak256, Address, Bytes, B256, U256},
};
use async_trait::async_trait;
use futures::FutureExt;

use super::chain::{
    ContractBackend, ContractEvent, EventListener, PendingTx, SubscriptionId, TxReceipt,
};
use super::error::{ChainError, RuntimeError};
use super::runtime::{Ciphertext, FheInstance, FheRuntime, InstanceConfig, Keypair};
use super::types::{EncryptedType, SessionConfig, TransactionOptions};

#[derive(Default)]
struct MockState {
    plaintexts: Mutex<HashMap<B256, U256>>,
    failing: Mutex<HashSet<B256>>,
    gateway_delay: Mutex<Option<Duration>>,
    unreachable: AtomicBool,
    nonce: AtomicU64,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
    instances_created: AtomicUsize,
}

/// Deterministic runtime that round-trips values. Clones share state.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle under which a ciphertext is recorded.
    pub fn handle_of(ciphertext: &[u8]) -> B256 {
        keccak256(ciphertext)
    }

    /// Make every decryption of `handle` fail.
    pub fn fail_handle(&self, handle: B256) {
        if let Ok(mut failing) = self.state.failing.lock() {
            failing.insert(handle);
        }
    }

    /// Simulate an unreachable gateway for key fetches and instance creation.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delay every gateway round-trip (key fetches and decryptions).
    pub fn set_gateway_delay(&self, delay: Duration) {
        if let Ok(mut slot) = self.state.gateway_delay.lock() {
            *slot = Some(delay);
        }
    }

    pub fn encrypt_calls(&self) -> usize {
        self.state.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.state.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn instances_created(&self) -> usize {
        self.state.instances_created.load(Ordering::SeqCst)
    }

    async fn gateway_round_trip(state: &MockState) {
        let delay = state.gateway_delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_reachable(&self) -> Result<(), RuntimeError> {
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(RuntimeError::Unreachable("mock gateway offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FheRuntime for MockRuntime {
    async fn fetch_public_key(&self, config: &SessionConfig) -> Result<Bytes, RuntimeError> {
        Self::gateway_round_trip(&self.state).await;
        self.check_reachable()?;
        let mut seed = b"mock-network-key".to_vec();
        seed.extend_from_slice(&config.chain_id.to_be_bytes());
        Ok(Bytes::from(keccak256(&seed).to_vec()))
    }

    async fn create_instance(
        &self,
        config: InstanceConfig,
    ) -> Result<Arc<dyn FheInstance>, RuntimeError> {
        self.check_reachable()?;
        if config.chain_id == 0 {
            return Err(RuntimeError::InvalidConfig("invalid chain id 0".into()));
        }
        self.state.instances_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockInstance {
            state: Arc::clone(&self.state),
            chain_id: config.chain_id,
        }))
    }
}

struct MockInstance {
    state: Arc<MockState>,
    chain_id: u64,
}

impl MockInstance {
    fn next_nonce(&self) -> u64 {
        self.state.nonce.fetch_add(1, Ordering::SeqCst)
    }

    fn mask(&self, nonce: u64) -> B256 {
        let mut seed = self.chain_id.to_be_bytes().to_vec();
        seed.extend_from_slice(&nonce.to_be_bytes());
        keccak256(&seed)
    }
}

#[async_trait]
impl FheInstance for MockInstance {
    fn generate_keypair(&self) -> Keypair {
        let nonce = self.next_nonce().to_be_bytes();
        let public = keccak256([b"public".as_slice(), &nonce[..]].concat());
        let private = keccak256([b"private".as_slice(), &nonce[..]].concat());
        Keypair {
            public_key: Bytes::from(public.to_vec()),
            private_key: Bytes::from(private.to_vec()),
        }
    }

    fn encrypt(
        &self,
        value: U256,
        encrypted_type: EncryptedType,
    ) -> Result<Ciphertext, RuntimeError> {
        self.state.encrypt_calls.fetch_add(1, Ordering::SeqCst);

        let nonce = self.next_nonce();
        let mask = self.mask(nonce);
        let masked: Vec<u8> = value
            .to_be_bytes::<32>()
            .iter()
            .zip(mask.iter())
            .map(|(v, m)| v ^ m)
            .collect();

        // type width (u16) || nonce || masked value
        let mut data = Vec::with_capacity(2 + 8 + 32);
        data.extend_from_slice(&(encrypted_type.bits() as u16).to_be_bytes());
        data.extend_from_slice(&nonce.to_be_bytes());
        data.extend_from_slice(&masked);

        let handle = MockRuntime::handle_of(&data);
        self.state
            .plaintexts
            .lock()
            .map_err(|e| RuntimeError::Encryption(e.to_string()))?
            .insert(handle, value);

        Ok(Ciphertext {
            data: Bytes::from(data),
            handle: Some(handle),
        })
    }

    async fn request_decryption(
        &self,
        _contract_address: Address,
        handle: B256,
        _keypair: &Keypair,
    ) -> Result<U256, RuntimeError> {
        self.state.decrypt_calls.fetch_add(1, Ordering::SeqCst);

        MockRuntime::gateway_round_trip(&self.state).await;

        let failing = self
            .state
            .failing
            .lock()
            .map(|set| set.contains(&handle))
            .unwrap_or(false);
        if failing {
            return Err(RuntimeError::Decryption(format!("gateway rejected {handle}")));
        }

        self.state
            .plaintexts
            .lock()
            .map_err(|e| RuntimeError::Decryption(e.to_string()))?
            .get(&handle)
            .copied()
            .ok_or_else(|| RuntimeError::Decryption(format!("unknown handle {handle}")))
    }
}

/// A call recorded by [`MockContract::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentCall {
    pub function: String,
    pub args: Vec<DynSolValue>,
    pub options: TransactionOptions,
}

#[derive(Default)]
struct ContractState {
    sent: Mutex<Vec<SentCall>>,
    views: Mutex<HashMap<String, Vec<DynSolValue>>>,
    listeners: Mutex<HashMap<String, Vec<(SubscriptionId, EventListener)>>>,
    gas_estimate: Mutex<Option<u64>>,
    revert_reason: Mutex<Option<String>>,
    failed_receipts: AtomicBool,
    never_confirm: AtomicBool,
    block: AtomicU64,
}

/// In-memory contract backend. Clones share state.
#[derive(Clone)]
pub struct MockContract {
    address: Address,
    state: Arc<ContractState>,
}

impl MockContract {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: Arc::default(),
        }
    }

    /// Outputs returned by every `call` of `function`.
    pub fn set_view(&self, function: &str, outputs: Vec<DynSolValue>) {
        if let Ok(mut views) = self.state.views.lock() {
            views.insert(function.to_string(), outputs);
        }
    }

    /// Gas reported by `estimate_gas`; `None` makes estimation fail.
    pub fn set_gas_estimate(&self, gas: Option<u64>) {
        if let Ok(mut slot) = self.state.gas_estimate.lock() {
            *slot = gas;
        }
    }

    /// Make every `send` revert with `reason`.
    pub fn set_revert(&self, reason: Option<&str>) {
        if let Ok(mut slot) = self.state.revert_reason.lock() {
            *slot = reason.map(str::to_string);
        }
    }

    /// Receipts report a failed status.
    pub fn set_failed_receipts(&self, failed: bool) {
        self.state.failed_receipts.store(failed, Ordering::SeqCst);
    }

    /// Confirmation futures never resolve.
    pub fn set_never_confirm(&self, never: bool) {
        self.state.never_confirm.store(never, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentCall> {
        self.state
            .sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.state
            .listeners
            .lock()
            .map(|l| l.get(event).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Deliver an event to every listener of `event`. Returns how many ran.
    pub fn emit(&self, event: &str, args: Vec<DynSolValue>) -> usize {
        let listeners: Vec<EventListener> = self
            .state
            .listeners
            .lock()
            .map(|l| {
                l.get(event)
                    .map(|v| v.iter().map(|(_, f)| Arc::clone(f)).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let block_number = self.state.block.fetch_add(1, Ordering::SeqCst);
        for listener in &listeners {
            listener(ContractEvent {
                name: event.to_string(),
                address: self.address,
                args: args.clone(),
                block_number: Some(block_number),
                tx_hash: None,
            });
        }
        listeners.len()
    }
}

#[async_trait]
impl ContractBackend for MockContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn send(
        &self,
        function: &str,
        args: &[DynSolValue],
        options: &TransactionOptions,
    ) -> Result<PendingTx, ChainError> {
        let revert = self
            .state
            .revert_reason
            .lock()
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .clone();
        if let Some(reason) = revert {
            return Err(ChainError::Reverted(reason));
        }

        let nonce = {
            let mut sent = self
                .state
                .sent
                .lock()
                .map_err(|e| ChainError::Rpc(e.to_string()))?;
            sent.push(SentCall {
                function: function.to_string(),
                args: args.to_vec(),
                options: options.clone(),
            });
            sent.len() as u64
        };

        let mut seed = function.as_bytes().to_vec();
        seed.extend_from_slice(&nonce.to_be_bytes());
        let tx_hash = keccak256(&seed);

        let success = !self.state.failed_receipts.load(Ordering::SeqCst);
        let never_confirm = self.state.never_confirm.load(Ordering::SeqCst);
        let block_number = self.state.block.fetch_add(1, Ordering::SeqCst);

        Ok(PendingTx::new(tx_hash, move |confirmations| {
            if never_confirm {
                return futures::future::pending::<Result<TxReceipt, ChainError>>().boxed();
            }
            futures::future::ready(Ok(TxReceipt {
                tx_hash,
                block_number: block_number + confirmations.saturating_sub(1),
                gas_used: 21_000,
                success,
            }))
            .boxed()
        }))
    }

    async fn call(
        &self,
        function: &str,
        _args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ChainError> {
        self.state
            .views
            .lock()
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .get(function)
            .cloned()
            .ok_or_else(|| ChainError::UnknownFunction(function.to_string()))
    }

    async fn estimate_gas(&self, function: &str, _args: &[DynSolValue]) -> Result<u64, ChainError> {
        self.state
            .gas_estimate
            .lock()
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or_else(|| ChainError::Rpc(format!("cannot estimate gas for {function}")))
    }

    fn subscribe(
        &self,
        event: &str,
        listener: EventListener,
    ) -> Result<SubscriptionId, ChainError> {
        let id = SubscriptionId::new();
        self.state
            .listeners
            .lock()
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        Ok(id)
    }

    fn unsubscribe(&self, event: &str, id: Option<SubscriptionId>) -> usize {
        let Ok(mut listeners) = self.state.listeners.lock() else {
            return 0;
        };
        let Some(registered) = listeners.get_mut(event) else {
            return 0;
        };
        let before = registered.len();
        match id {
            Some(id) => registered.retain(|(existing, _)| *existing != id),
            None => registered.clear(),
        }
        let removed = before - registered.len();
        if registered.is_empty() {
            listeners.remove(event);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn instance(runtime: &MockRuntime) -> Arc<dyn FheInstance> {
        let config = SessionConfig::new(31337);
        let key = runtime.fetch_public_key(&config).await.unwrap();
        runtime
            .create_instance(InstanceConfig::from_session(&config, key))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips() {
        let runtime = MockRuntime::new();
        let instance = instance(&runtime).await;
        let keypair = instance.generate_keypair();

        let ct = instance.encrypt(U256::from(42u8), EncryptedType::Euint8).unwrap();
        let handle = ct.handle.expect("mock reports handles");
        assert_eq!(handle, MockRuntime::handle_of(&ct.data));

        let value = instance
            .request_decryption(Address::ZERO, handle, &keypair)
            .await
            .unwrap();
        assert_eq!(value, U256::from(42u8));
    }

    #[tokio::test]
    async fn same_value_encrypts_to_distinct_ciphertexts() {
        let runtime = MockRuntime::new();
        let instance = instance(&runtime).await;

        let a = instance.encrypt(U256::from(7u8), EncryptedType::Euint8).unwrap();
        let b = instance.encrypt(U256::from(7u8), EncryptedType::Euint8).unwrap();
        assert_ne!(a.data, b.data);
        assert_eq!(runtime.encrypt_calls(), 2);
    }

    #[tokio::test]
    async fn rejects_chain_id_zero_and_offline_gateway() {
        let runtime = MockRuntime::new();
        let config = InstanceConfig::from_session(&SessionConfig::new(0), Bytes::new());
        assert!(matches!(
            runtime.create_instance(config).await,
            Err(RuntimeError::InvalidConfig(_))
        ));

        runtime.set_unreachable(true);
        assert!(matches!(
            runtime.fetch_public_key(&SessionConfig::new(1)).await,
            Err(RuntimeError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn failing_and_unknown_handles_error() {
        let runtime = MockRuntime::new();
        let instance = instance(&runtime).await;
        let keypair = instance.generate_keypair();

        let ct = instance.encrypt(U256::from(1u8), EncryptedType::Ebool).unwrap();
        let handle = ct.handle.unwrap();
        runtime.fail_handle(handle);

        assert!(instance
            .request_decryption(Address::ZERO, handle, &keypair)
            .await
            .is_err());
        assert!(instance
            .request_decryption(Address::ZERO, B256::repeat_byte(9), &keypair)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn mock_contract_records_and_emits() {
        let contract = MockContract::new(Address::repeat_byte(1));
        let pending = contract
            .send("registerPet", &[DynSolValue::Bool(true)], &TransactionOptions::default())
            .await
            .unwrap();
        assert!(pending.confirmations(1).await.unwrap().success);
        assert_eq!(contract.sent()[0].function, "registerPet");

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let id = contract
            .subscribe(
                "PetRegistered",
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert_eq!(contract.emit("PetRegistered", vec![]), 1);
        assert_eq!(contract.unsubscribe("PetRegistered", Some(id)), 1);
        assert_eq!(contract.emit("PetRegistered", vec![]), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
