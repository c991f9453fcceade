// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Observable state of one kind of async operation.

use std::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
};

use tokio::sync::watch;

use crate::fhevm::FhevmError;

/// What a presentation layer renders for an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState<T> {
    /// At least one invocation is in flight.
    pub is_busy: bool,
    /// Error of the most recently settled invocation, cleared when a new one starts.
    pub error: Option<FhevmError>,
    /// Result of the most recent successful invocation.
    pub last_result: Option<T>,
}

impl<T> Default for BindingState<T> {
    fn default() -> Self {
        Self {
            is_busy: false,
            error: None,
            last_result: None,
        }
    }
}

/// Tracks invocations of an operation and publishes [`BindingState`].
///
/// Concurrent invocations are not serialized; whichever settles last
/// determines the stored result or error.
pub struct Operation<T> {
    state: watch::Sender<BindingState<T>>,
    in_flight: AtomicUsize,
}

impl<T: Clone> Operation<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(BindingState::default());
        Self {
            state,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<BindingState<T>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> BindingState<T> {
        self.state.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy
    }

    pub fn error(&self) -> Option<FhevmError> {
        self.state.borrow().error.clone()
    }

    pub fn last_result(&self) -> Option<T> {
        self.state.borrow().last_result.clone()
    }

    /// Await `fut`, recording its outcome.
    pub async fn run<F>(&self, fut: F) -> Result<T, FhevmError>
    where
        F: Future<Output = Result<T, FhevmError>>,
    {
        self.run_with(fut, T::clone).await
    }

    /// Await `fut`, recording `record(&output)` on success. For outputs that
    /// cannot be cloned into the state themselves.
    pub async fn run_with<R, F>(
        &self,
        fut: F,
        record: impl FnOnce(&R) -> T,
    ) -> Result<R, FhevmError>
    where
        F: Future<Output = Result<R, FhevmError>>,
    {
        let guard = InFlight::start(self);

        let result = fut.await;
        self.state.send_modify(|state| match &result {
            Ok(output) => {
                state.last_result = Some(record(output));
                state.error = None;
            }
            Err(e) => state.error = Some(e.clone()),
        });

        drop(guard);
        result
    }
}

impl<T: Clone> Default for Operation<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps `is_busy` accurate even when an invocation is cancelled.
struct InFlight<'a, T> {
    op: &'a Operation<T>,
}

impl<'a, T> InFlight<'a, T> {
    fn start(op: &'a Operation<T>) -> Self {
        op.in_flight.fetch_add(1, Ordering::SeqCst);
        op.state.send_modify(|state| {
            state.is_busy = true;
            state.error = None;
        });
        Self { op }
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.op.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.op.state.send_modify(|state| state.is_busy = false);
        }
    }
}
