// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! FHEVM SDK - Client SDK for encrypted FHEVM contract calls
//!
//! Wraps an external FHE runtime with a session lifecycle, signs encrypted
//! inputs and reencryption requests with EIP-712, and marshals encrypted
//! arguments into alloy contract calls.
//!
//! ## Modules
//!
//! - `fhevm` - Client session, contract call marshaler and chain backend
//! - `bindings` - Reactive state holders for UI layers
//! - `pets` - Typed wrapper for the PetDNAMatching contract
//! - `api` - Demo HTTP API handlers (Axum)

pub mod api;
pub mod bindings;
pub mod config;
pub mod error;
pub mod fhevm;
pub mod models;
pub mod pets;
pub mod state;
