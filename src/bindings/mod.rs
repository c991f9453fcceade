// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reactive bindings for UI layers.
//!
//! Each binding publishes its state on a `tokio::sync::watch` channel; any
//! presentation layer subscribes and re-renders on change.

pub mod actions;
pub mod operation;
pub mod session;

pub use actions::{ContractBinding, ContractOutcome, DecryptBinding, EncryptBinding};
pub use operation::{BindingState, Operation};
pub use session::{SessionBinding, SessionState};
