// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use tokio::sync::RwLock;

use crate::fhevm::SEPOLIA;

#[derive(Clone)]
pub struct AppState {
    pub chain_id: u64,
    /// Reencryption public keys registered per user.
    pub keys: Arc<RwLock<HashMap<Address, String>>>,
}

impl AppState {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SEPOLIA.chain_id)
    }
}
