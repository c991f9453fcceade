// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session lifecycle binding.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::watch;

use crate::fhevm::{FheRuntime, FhevmClient, FhevmError, InitializationStatus, SessionConfig};

/// Published state of a [`SessionBinding`].
#[derive(Clone)]
pub struct SessionState {
    pub status: InitializationStatus,
    pub error: Option<FhevmError>,
    /// Present only while initialized.
    pub client: Option<Arc<FhevmClient>>,
}

impl SessionState {
    pub fn is_initialized(&self) -> bool {
        self.status == InitializationStatus::Initialized
    }

    pub fn is_initializing(&self) -> bool {
        self.status == InitializationStatus::Initializing
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: InitializationStatus::NotInitialized,
            error: None,
            client: None,
        }
    }
}

/// Owns one session at a time and publishes its lifecycle.
///
/// Every `initialize` after a `reset` creates a fresh [`FhevmClient`].
/// Dropping the binding resets the current client.
pub struct SessionBinding {
    config: SessionConfig,
    runtime: Arc<dyn FheRuntime>,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
}

impl SessionBinding {
    pub fn new(config: SessionConfig, runtime: Arc<dyn FheRuntime>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            config,
            runtime,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    /// Create the binding and start initializing right away. A failure is
    /// recorded in the state, not returned.
    pub async fn auto_initialize(config: SessionConfig, runtime: Arc<dyn FheRuntime>) -> Self {
        let binding = Self::new(config, runtime);
        if let Err(e) = binding.initialize().await {
            tracing::warn!(error = %e, "Automatic FHEVM initialization failed");
        }
        binding
    }

    /// Initialize a new session. No-op while initializing or initialized.
    pub async fn initialize(&self) -> Result<(), FhevmError> {
        let started = self.state.send_if_modified(|state| match state.status {
            InitializationStatus::Initializing | InitializationStatus::Initialized => false,
            _ => {
                state.status = InitializationStatus::Initializing;
                state.error = None;
                true
            }
        });
        if !started {
            return Ok(());
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let client = Arc::new(FhevmClient::new(
            self.config.clone(),
            Arc::clone(&self.runtime),
        ));
        let result = client.initialize().await;

        // The epoch is compared while the channel is locked, so a reset
        // either replaces what is stored here or makes the check fail.
        let current = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            match &result {
                Ok(()) => {
                    state.status = InitializationStatus::Initialized;
                    state.client = Some(Arc::clone(&client));
                }
                Err(e) => {
                    state.status = InitializationStatus::Error;
                    state.error = Some(e.clone());
                }
            }
            true
        });

        if !current {
            client.reset();
            return Err(FhevmError::SessionReset);
        }
        if let Err(e) = &result {
            tracing::error!(error = %e, "Failed to initialize FHEVM client");
        }
        result
    }

    /// Reset the current client and return to `NotInitialized`.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let previous = self.state.send_replace(SessionState::default());
        if let Some(client) = previous.client {
            client.reset();
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> InitializationStatus {
        self.state.borrow().status
    }

    pub fn error(&self) -> Option<FhevmError> {
        self.state.borrow().error.clone()
    }

    pub fn client(&self) -> Option<Arc<FhevmClient>> {
        self.state.borrow().client.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().is_initialized()
    }
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        if let Some(client) = self.state.borrow().client.as_ref() {
            client.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fhevm::mock::MockRuntime;
    use crate::fhevm::signing::{signer_from_hex, tests::DEV_KEY};

    fn config() -> SessionConfig {
        SessionConfig::new(31337)
            .with_rpc_url("http://localhost:8545".parse().unwrap())
            .with_signer(Arc::new(signer_from_hex(DEV_KEY).unwrap()))
    }

    #[tokio::test]
    async fn initialize_publishes_client() {
        let runtime = MockRuntime::new();
        let binding = SessionBinding::new(config(), Arc::new(runtime.clone()));
        let mut rx = binding.subscribe();
        assert_eq!(binding.status(), InitializationStatus::NotInitialized);
        assert!(binding.client().is_none());

        binding.initialize().await.unwrap();
        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(state.is_initialized());
        assert!(state.client.unwrap().is_initialized());

        // Second call is a no-op.
        binding.initialize().await.unwrap();
        assert_eq!(runtime.instances_created(), 1);
    }

    #[tokio::test]
    async fn failure_is_recorded_and_retryable() {
        let runtime = MockRuntime::new();
        runtime.set_unreachable(true);
        let binding = SessionBinding::auto_initialize(config(), Arc::new(runtime.clone())).await;

        assert_eq!(binding.status(), InitializationStatus::Error);
        assert!(matches!(binding.error(), Some(FhevmError::Initialization(_))));
        assert!(binding.client().is_none());

        runtime.set_unreachable(false);
        binding.initialize().await.unwrap();
        assert!(binding.is_initialized());
        assert!(binding.error().is_none());
    }

    #[tokio::test]
    async fn reset_and_drop_tear_down_the_client() {
        let binding = SessionBinding::new(config(), Arc::new(MockRuntime::new()));
        binding.initialize().await.unwrap();
        let client = binding.client().unwrap();

        binding.reset();
        assert_eq!(binding.status(), InitializationStatus::NotInitialized);
        assert!(!client.is_initialized());

        binding.initialize().await.unwrap();
        let client = binding.client().unwrap();
        drop(binding);
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn reset_while_initializing_discards_the_session() {
        let runtime = MockRuntime::new();
        runtime.set_gateway_delay(Duration::from_millis(50));
        let binding = Arc::new(SessionBinding::new(config(), Arc::new(runtime)));

        let init = {
            let binding = Arc::clone(&binding);
            tokio::spawn(async move { binding.initialize().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(binding.status(), InitializationStatus::Initializing);

        binding.reset();

        assert_eq!(init.await.unwrap(), Err(FhevmError::SessionReset));
        assert_eq!(binding.status(), InitializationStatus::NotInitialized);
        assert!(binding.client().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reset_racing_the_final_publish_wins() {
        let runtime = MockRuntime::new();
        runtime.set_gateway_delay(Duration::from_millis(50));
        let binding = Arc::new(SessionBinding::new(config(), Arc::new(runtime)));

        let init = {
            let binding = Arc::clone(&binding);
            tokio::spawn(async move { binding.initialize().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // A held borrow keeps initialize from publishing once its client is
        // ready; the epoch bump of a reset lands before the borrow ends.
        let held = binding.state.borrow();
        std::thread::sleep(Duration::from_millis(100));
        binding.epoch.fetch_add(1, Ordering::SeqCst);
        drop(held);

        assert_eq!(init.await.unwrap(), Err(FhevmError::SessionReset));
        assert!(binding.client().is_none());
    }
}
