// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypt, decrypt and contract bindings.
//!
//! Each binding wraps one SDK entry point in an [`Operation`]. Without a
//! client or contract they fail with [`FhevmError::NotInitialized`] and leave
//! their state untouched.

use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Bytes, TxHash, U256},
};

use super::operation::{BindingState, Operation};
use crate::fhevm::{
    ContractBackend, DecryptionRequest, EncryptedCall, EncryptedIndex, EncryptedResult,
    EncryptionInput, FhevmClient, FhevmContract, FhevmError,
};

/// Wraps [`FhevmClient::encrypt`].
pub struct EncryptBinding {
    client: Option<Arc<FhevmClient>>,
    op: Operation<EncryptedResult>,
}

impl EncryptBinding {
    pub fn new(client: Option<Arc<FhevmClient>>) -> Self {
        Self {
            client,
            op: Operation::new(),
        }
    }

    pub async fn encrypt(&self, input: &EncryptionInput) -> Result<EncryptedResult, FhevmError> {
        let client = self.client.as_ref().ok_or(FhevmError::NotInitialized)?;
        self.op.run(client.encrypt(input)).await
    }

    pub fn state(&self) -> &Operation<EncryptedResult> {
        &self.op
    }
}

/// Wraps [`FhevmClient::decrypt`].
pub struct DecryptBinding {
    client: Option<Arc<FhevmClient>>,
    op: Operation<Vec<U256>>,
}

impl DecryptBinding {
    pub fn new(client: Option<Arc<FhevmClient>>) -> Self {
        Self {
            client,
            op: Operation::new(),
        }
    }

    pub async fn decrypt(&self, request: &DecryptionRequest) -> Result<Vec<U256>, FhevmError> {
        let client = self.client.as_ref().ok_or(FhevmError::NotInitialized)?;
        self.op.run(client.decrypt(request)).await
    }

    pub fn state(&self) -> &Operation<Vec<U256>> {
        &self.op
    }
}

/// Latest settled contract interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractOutcome {
    Submitted {
        tx_hash: TxHash,
        signatures: Vec<Bytes>,
    },
    Viewed(Vec<DynSolValue>),
    Decrypted(U256),
}

/// Wraps a contract's calls behind one loading flag and error.
pub struct ContractBinding<B> {
    contract: Option<Arc<FhevmContract<B>>>,
    op: Operation<ContractOutcome>,
}

impl<B: ContractBackend> ContractBinding<B> {
    pub fn new(contract: Option<Arc<FhevmContract<B>>>) -> Self {
        Self {
            contract,
            op: Operation::new(),
        }
    }

    pub fn contract(&self) -> Option<&Arc<FhevmContract<B>>> {
        self.contract.as_ref()
    }

    pub async fn call(
        &self,
        function: &str,
        args: &[DynSolValue],
        encrypted: &[EncryptedIndex],
    ) -> Result<EncryptedCall, FhevmError> {
        let contract = self.contract.as_ref().ok_or(FhevmError::NotInitialized)?;
        self.op
            .run_with(
                contract.call_with_encryption(function, args, encrypted),
                |call| ContractOutcome::Submitted {
                    tx_hash: call.tx.tx_hash(),
                    signatures: call.signatures.clone(),
                },
            )
            .await
    }

    pub async fn view(
        &self,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, FhevmError> {
        let contract = self.contract.as_ref().ok_or(FhevmError::NotInitialized)?;
        self.op
            .run_with(contract.view(function, args), |values| {
                ContractOutcome::Viewed(values.clone())
            })
            .await
    }

    pub async fn view_with_decryption(
        &self,
        function: &str,
        args: &[DynSolValue],
        handle_index: usize,
    ) -> Result<U256, FhevmError> {
        let contract = self.contract.as_ref().ok_or(FhevmError::NotInitialized)?;
        self.op
            .run_with(
                contract.view_with_decryption(function, args, handle_index),
                |value| ContractOutcome::Decrypted(*value),
            )
            .await
    }

    pub fn state(&self) -> &Operation<ContractOutcome> {
        &self.op
    }

    pub fn snapshot(&self) -> BindingState<ContractOutcome> {
        self.op.snapshot()
    }
}
