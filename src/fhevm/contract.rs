// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract call marshaler.
//!
//! [`FhevmContract`] pairs a [`ContractBackend`] with a session. Arguments
//! flagged by an [`EncryptedIndex`] are encrypted for the contract before the
//! call is submitted; handles read back from view functions are decrypted
//! through the same session.

use std::{sync::Arc, time::Duration};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, B256, U256},
};

use super::chain::{ContractBackend, ContractEvent, PendingTx, SubscriptionId, TxReceipt};
use super::client::FhevmClient;
use super::error::FhevmError;
use super::types::{DecryptionRequest, EncryptedIndex, EncryptionInput, TransactionOptions};

/// Gas limit assumed when estimation fails.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

/// Default time to wait for a confirmation.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of confirmations to wait for.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// A submitted call with encrypted arguments.
#[derive(Debug)]
pub struct EncryptedCall {
    pub tx: PendingTx,
    /// Input signatures, one per encrypted argument in `EncryptedIndex` order.
    pub signatures: Vec<Bytes>,
}

impl EncryptedCall {
    /// Wait with the default confirmations and timeout.
    pub async fn wait(self) -> Result<TxReceipt, FhevmError> {
        wait_for_transaction(self.tx, DEFAULT_CONFIRMATIONS, DEFAULT_TX_TIMEOUT).await
    }
}

/// A contract whose calls go through an FHEVM session.
pub struct FhevmContract<B> {
    backend: B,
    client: Arc<FhevmClient>,
}

impl<B: ContractBackend> FhevmContract<B> {
    pub fn new(backend: B, client: Arc<FhevmClient>) -> Self {
        Self { backend, client }
    }

    pub fn address(&self) -> Address {
        self.backend.address()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn client(&self) -> &Arc<FhevmClient> {
        &self.client
    }

    /// Encrypt the flagged arguments and submit `function`.
    pub async fn call_with_encryption(
        &self,
        function: &str,
        args: &[DynSolValue],
        encrypted: &[EncryptedIndex],
    ) -> Result<EncryptedCall, FhevmError> {
        self.call_with_encryption_and_options(function, args, encrypted, &TransactionOptions::default())
            .await
    }

    /// Like [`call_with_encryption`](Self::call_with_encryption), with gas,
    /// nonce and value overrides.
    pub async fn call_with_encryption_and_options(
        &self,
        function: &str,
        args: &[DynSolValue],
        encrypted: &[EncryptedIndex],
        options: &TransactionOptions,
    ) -> Result<EncryptedCall, FhevmError> {
        // Every flagged argument is checked before the first encryption.
        let plaintexts = encrypted
            .iter()
            .map(|flag| {
                let value = plaintext_at(args, flag.index)?;
                flag.encrypted_type.validate(value)?;
                Ok((*flag, value))
            })
            .collect::<Result<Vec<_>, FhevmError>>()?;

        let contract_address = self.address();
        let mut processed = args.to_vec();
        let mut signatures = Vec::with_capacity(plaintexts.len());

        for (flag, value) in plaintexts {
            let input = EncryptionInput::new(value, flag.encrypted_type, contract_address);
            let result = self.client.encrypt(&input).await?;
            processed[flag.index] = DynSolValue::Bytes(result.data.to_vec());
            signatures.push(result.signature);
        }

        tracing::debug!(
            contract = %contract_address,
            function,
            encrypted_args = signatures.len(),
            "Submitting call with encrypted arguments"
        );

        let tx = self.backend.send(function, &processed, options).await?;
        Ok(EncryptedCall { tx, signatures })
    }

    /// Read-only call, outputs decoded as returned by the backend.
    pub async fn view(
        &self,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, FhevmError> {
        Ok(self.backend.call(function, args).await?)
    }

    /// Call a view returning an encrypted handle and decrypt it.
    ///
    /// `handle_index` selects the output, or the field of a single tuple
    /// output.
    pub async fn view_with_decryption(
        &self,
        function: &str,
        args: &[DynSolValue],
        handle_index: usize,
    ) -> Result<U256, FhevmError> {
        let outputs = self.view(function, args).await?;
        let handle = handle_at(&outputs, handle_index)?;
        let contract_address = self.address();

        // The runtime's gateway round-trip does not accept the signature. It
        // authorizes decryption for the user, so only its length is logged.
        let signature = self
            .client
            .create_reencryption_request(contract_address, handle)
            .await?;
        tracing::debug!(
            contract = %contract_address,
            handle = %handle,
            signature_len = signature.len(),
            "Reencryption request signed"
        );

        let values = self
            .client
            .decrypt(&DecryptionRequest {
                contract_address,
                handles: vec![handle],
            })
            .await?;
        Ok(values.first().copied().unwrap_or_default())
    }

    pub fn on<F>(&self, event: &str, listener: F) -> Result<SubscriptionId, FhevmError>
    where
        F: Fn(ContractEvent) + Send + Sync + 'static,
    {
        Ok(self.backend.subscribe(event, Arc::new(listener))?)
    }

    /// Remove one listener, or all listeners of `event` when `id` is `None`.
    pub fn off(&self, event: &str, id: Option<SubscriptionId>) -> usize {
        self.backend.unsubscribe(event, id)
    }

    /// Gas estimate with the [`DEFAULT_GAS_LIMIT`] fallback.
    pub async fn estimate_gas(&self, function: &str, args: &[DynSolValue]) -> u64 {
        estimate_encrypted_gas(&self.backend, function, args).await
    }
}

/// Estimate gas for `function`, falling back to [`DEFAULT_GAS_LIMIT`].
pub async fn estimate_encrypted_gas<B: ContractBackend + ?Sized>(
    backend: &B,
    function: &str,
    args: &[DynSolValue],
) -> u64 {
    match backend.estimate_gas(function, args).await {
        Ok(gas) => gas,
        Err(e) => {
            tracing::warn!(
                contract = %backend.address(),
                function,
                error = %e,
                fallback = DEFAULT_GAS_LIMIT,
                "Gas estimation failed, using default limit"
            );
            DEFAULT_GAS_LIMIT
        }
    }
}

/// Wait for `confirmations`, giving up after `timeout`.
pub async fn wait_for_transaction(
    tx: PendingTx,
    confirmations: u64,
    timeout: Duration,
) -> Result<TxReceipt, FhevmError> {
    let tx_hash = tx.tx_hash();

    let receipt = tokio::time::timeout(timeout, tx.confirmations(confirmations))
        .await
        .map_err(|_| FhevmError::TransactionTimeout { tx_hash, timeout })??;

    if !receipt.success {
        return Err(FhevmError::TransactionFailed(tx_hash));
    }
    Ok(receipt)
}

fn plaintext_at(args: &[DynSolValue], index: usize) -> Result<U256, FhevmError> {
    let arg = args.get(index).ok_or_else(|| {
        FhevmError::InvalidArgument(format!(
            "Encrypted index {index} out of range for {} arguments",
            args.len()
        ))
    })?;

    match arg {
        DynSolValue::Uint(value, _) => Ok(*value),
        DynSolValue::Bool(flag) => Ok(U256::from(*flag as u8)),
        DynSolValue::Int(value, _) if !value.is_negative() => Ok(value.into_raw()),
        other => Err(FhevmError::InvalidArgument(format!(
            "Argument {index} is not an unsigned number: {other:?}"
        ))),
    }
}

fn handle_at(outputs: &[DynSolValue], index: usize) -> Result<B256, FhevmError> {
    let fields = match outputs {
        [DynSolValue::Tuple(inner)]
        | [DynSolValue::Array(inner)]
        | [DynSolValue::FixedArray(inner)] => inner.as_slice(),
        _ => outputs,
    };

    let value = fields.get(index).ok_or_else(|| {
        FhevmError::InvalidArgument(format!(
            "Handle index {index} out of range for {} outputs",
            fields.len()
        ))
    })?;

    match value {
        DynSolValue::FixedBytes(word, 32) => Ok(*word),
        DynSolValue::Uint(value, _) => Ok(B256::from(*value)),
        DynSolValue::Bytes(bytes) if bytes.len() == 32 => Ok(B256::from_slice(bytes)),
        other => Err(FhevmError::InvalidArgument(format!(
            "Output {index} is not a ciphertext handle: {other:?}"
        ))),
    }
}
