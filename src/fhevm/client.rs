// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client session bound to one chain and one wallet signer.
//!
//! A session starts uninitialized. [`FhevmClient::initialize`] resolves a
//! runtime instance and an ephemeral keypair exactly once; [`FhevmClient::reset`]
//! drops both. Every async operation captures the session generation when it
//! starts and fails with [`FhevmError::SessionReset`] if a reset happened
//! before it completed, so callers never act on results from a torn-down
//! session.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};

use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::Utc;

use super::error::FhevmError;
use super::runtime::{FheInstance, FheRuntime, InstanceConfig, Keypair};
use super::signing::{
    input_verifier_domain, reencryption_domain, sign_typed, EncryptedInput, Reencryption,
    WalletSigner,
};
use super::types::{
    DecryptionRequest, DecryptionResult, EncryptedResult, EncryptionInput, InitializationStatus,
    SessionConfig,
};

#[derive(Clone)]
struct Session {
    instance: Arc<dyn FheInstance>,
    keypair: Keypair,
}

/// FHEVM client session.
pub struct FhevmClient {
    config: SessionConfig,
    runtime: Arc<dyn FheRuntime>,
    session: RwLock<Option<Session>>,
    generation: AtomicU64,
}

impl FhevmClient {
    /// Create an uninitialized session.
    pub fn new(config: SessionConfig, runtime: Arc<dyn FheRuntime>) -> Self {
        Self {
            config,
            runtime,
            session: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Resolve the runtime instance and generate the session keypair.
    ///
    /// Returns immediately when already initialized.
    pub async fn initialize(&self) -> Result<(), FhevmError> {
        if self.is_initialized() {
            return Ok(());
        }

        if self.config.rpc_url.is_none() && self.config.signer.is_none() {
            return Err(FhevmError::Initialization(
                "No provider available. Please connect your wallet.".into(),
            ));
        }

        let generation = self.generation();

        let public_key = self
            .runtime
            .fetch_public_key(&self.config)
            .await
            .map_err(|e| FhevmError::Initialization(e.to_string()))?;

        let instance = self
            .runtime
            .create_instance(InstanceConfig::from_session(&self.config, public_key))
            .await
            .map_err(|e| FhevmError::Initialization(e.to_string()))?;

        let keypair = instance.generate_keypair();

        // Checked under the write guard so a concurrent reset either sees the
        // stored session or makes this check fail.
        let mut slot = self.session.write().unwrap_or_else(|e| e.into_inner());
        self.ensure_current(generation)?;
        if slot.is_none() {
            *slot = Some(Session { instance, keypair });
            tracing::info!(chain_id = self.config.chain_id, "FHEVM session initialized");
        }
        Ok(())
    }

    /// Encrypt a value for `input.contract_address` and sign it for the user.
    pub async fn encrypt(&self, input: &EncryptionInput) -> Result<EncryptedResult, FhevmError> {
        let (session, generation) = self.session()?;

        input.encrypted_type.validate(input.value)?;

        let user = match input.user_address {
            Some(address) => address,
            None => self
                .config
                .signer
                .as_ref()
                .map(|signer| signer.address())
                .ok_or(FhevmError::MissingAddress)?,
        };

        let signer = self.signer()?;

        let ciphertext = session
            .instance
            .encrypt(input.value, input.encrypted_type)?;

        let payload = EncryptedInput {
            data: ciphertext.data.clone(),
            user,
        };
        let domain = input_verifier_domain(self.config.chain_id, input.contract_address);
        let signature = sign_typed(signer, &payload, &domain).await?;

        self.ensure_current(generation)?;

        Ok(EncryptedResult {
            data: ciphertext.data,
            signature,
            handle: ciphertext.handle,
        })
    }

    /// Decrypt every handle in `request`.
    ///
    /// A handle that fails to decrypt yields zero at its position instead of
    /// failing the batch.
    pub async fn decrypt(&self, request: &DecryptionRequest) -> Result<Vec<U256>, FhevmError> {
        Ok(self
            .decrypt_detailed(request)
            .await?
            .into_iter()
            .map(|result| result.value)
            .collect())
    }

    /// Like [`decrypt`](Self::decrypt), with the handle and completion time
    /// of each value.
    pub async fn decrypt_detailed(
        &self,
        request: &DecryptionRequest,
    ) -> Result<Vec<DecryptionResult>, FhevmError> {
        let (session, generation) = self.session()?;

        let mut results = Vec::with_capacity(request.handles.len());
        for handle in &request.handles {
            let value = match session
                .instance
                .request_decryption(request.contract_address, *handle, &session.keypair)
                .await
            {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        handle = %handle,
                        contract = %request.contract_address,
                        error = %e,
                        "Failed to decrypt handle, using zero"
                    );
                    U256::ZERO
                }
            };
            results.push(DecryptionResult {
                value,
                handle: *handle,
                timestamp: Utc::now(),
            });
        }

        self.ensure_current(generation)?;
        Ok(results)
    }

    /// Sign a reencryption request for `handle` under the session public key.
    pub async fn create_reencryption_request(
        &self,
        contract_address: Address,
        handle: B256,
    ) -> Result<Bytes, FhevmError> {
        let (session, generation) = self.session()?;
        let signer = self.signer()?;

        let payload = Reencryption {
            publicKey: session.keypair.public_key.clone(),
            handle,
        };
        let domain = reencryption_domain(self.config.chain_id, contract_address);
        let signature = sign_typed(signer, &payload, &domain).await?;

        self.ensure_current(generation)?;
        Ok(signature)
    }

    /// Drop the runtime instance and keypair. Safe to call in any state.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.session.write().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            tracing::info!(chain_id = self.config.chain_id, "FHEVM session reset");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn status(&self) -> InitializationStatus {
        if self.is_initialized() {
            InitializationStatus::Initialized
        } else {
            InitializationStatus::NotInitialized
        }
    }

    /// Public half of the session keypair, once initialized.
    pub fn public_key(&self) -> Option<Bytes> {
        self.session
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(|s| s.keypair.public_key.clone()))
    }

    /// Runtime instance, for callers that need direct access.
    pub fn instance(&self) -> Option<Arc<dyn FheInstance>> {
        self.session
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(|s| Arc::clone(&s.instance)))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn signer(&self) -> Result<&dyn WalletSigner, FhevmError> {
        self.config
            .signer
            .as_deref()
            .ok_or(FhevmError::MissingSigner)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn ensure_current(&self, generation: u64) -> Result<(), FhevmError> {
        if self.generation() != generation {
            return Err(FhevmError::SessionReset);
        }
        Ok(())
    }

    /// Snapshot of the live session, never held across an await.
    fn session(&self) -> Result<(Session, u64), FhevmError> {
        let generation = self.generation();
        let slot = self.session.read().unwrap_or_else(|e| e.into_inner());
        slot.clone()
            .map(|session| (session, generation))
            .ok_or(FhevmError::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fhevm::mock::MockRuntime;
    use crate::fhevm::signing::tests::{DEV_ADDRESS, DEV_KEY};
    use crate::fhevm::signing::signer_from_hex;
    use crate::fhevm::types::EncryptedType;
    use alloy::primitives::{address, Signature};
    use alloy::sol_types::SolStruct;

    const CONTRACT: Address = address!("C16ebe7Cb0A3B057437B8A3568d6Df2FB02812d1");

    fn config() -> SessionConfig {
        let signer = signer_from_hex(DEV_KEY).unwrap();
        SessionConfig::new(31337)
            .with_rpc_url("http://localhost:8545".parse().unwrap())
            .with_signer(Arc::new(signer))
    }

    async fn ready_client() -> (FhevmClient, MockRuntime) {
        let runtime = MockRuntime::new();
        let client = FhevmClient::new(config(), Arc::new(runtime.clone()));
        client.initialize().await.expect("initialize");
        (client, runtime)
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (client, runtime) = ready_client().await;
        let key = client.public_key();

        client.initialize().await.unwrap();
        assert_eq!(runtime.instances_created(), 1);
        assert_eq!(client.public_key(), key);
        assert_eq!(client.status(), InitializationStatus::Initialized);
    }

    #[tokio::test]
    async fn initialize_requires_provider_or_wallet() {
        let client = FhevmClient::new(SessionConfig::new(31337), Arc::new(MockRuntime::new()));
        assert!(matches!(
            client.initialize().await,
            Err(FhevmError::Initialization(_))
        ));
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn initialize_wraps_runtime_rejections() {
        let runtime = MockRuntime::new();
        let mut cfg = config();
        cfg.chain_id = 0;
        let client = FhevmClient::new(cfg, Arc::new(runtime.clone()));
        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, FhevmError::Initialization(ref m) if m.contains("chain id")));

        runtime.set_unreachable(true);
        let client = FhevmClient::new(config(), Arc::new(runtime));
        assert!(matches!(
            client.initialize().await,
            Err(FhevmError::Initialization(_))
        ));
    }

    #[tokio::test]
    async fn operations_before_initialize_fail_cleanly() {
        let client = FhevmClient::new(config(), Arc::new(MockRuntime::new()));
        let input = EncryptionInput::new(U256::from(1u8), EncryptedType::Euint8, CONTRACT);

        assert_eq!(client.encrypt(&input).await, Err(FhevmError::NotInitialized));
        let request = DecryptionRequest {
            contract_address: CONTRACT,
            handles: vec![B256::ZERO],
        };
        assert_eq!(client.decrypt(&request).await, Err(FhevmError::NotInitialized));
        assert_eq!(
            client.create_reencryption_request(CONTRACT, B256::ZERO).await,
            Err(FhevmError::NotInitialized)
        );
    }

    #[tokio::test]
    async fn out_of_range_values_never_reach_the_runtime() {
        let (client, runtime) = ready_client().await;

        let cases = [
            (EncryptedType::Ebool, U256::from(2u8)),
            (EncryptedType::Euint8, U256::from(256u16)),
            (EncryptedType::Euint16, U256::from(65_536u32)),
            (EncryptedType::Euint32, U256::from(1u64 << 32)),
            (EncryptedType::Euint64, U256::from(u64::MAX) + U256::from(1u8)),
            (EncryptedType::Euint128, U256::from(u128::MAX) + U256::from(1u8)),
        ];
        for (ty, value) in cases {
            let input = EncryptionInput::new(value, ty, CONTRACT);
            assert!(
                matches!(client.encrypt(&input).await, Err(FhevmError::InvalidValue(_))),
                "{ty} accepted {value}"
            );
        }
        assert_eq!(runtime.encrypt_calls(), 0);
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips() {
        let (client, _runtime) = ready_client().await;

        for (ty, value) in [
            (EncryptedType::Ebool, U256::from(1u8)),
            (EncryptedType::Euint8, U256::from(7u8)),
            (EncryptedType::Euint64, U256::from(u64::MAX)),
            (EncryptedType::Euint256, U256::MAX),
        ] {
            let encrypted = client
                .encrypt(&EncryptionInput::new(value, ty, CONTRACT))
                .await
                .unwrap();
            let handle = encrypted.handle.expect("mock reports handles");

            let decrypted = client
                .decrypt(&DecryptionRequest {
                    contract_address: CONTRACT,
                    handles: vec![handle],
                })
                .await
                .unwrap();
            assert_eq!(decrypted, vec![value]);
        }
    }

    #[tokio::test]
    async fn input_signature_binds_ciphertext_and_user() {
        let (client, _runtime) = ready_client().await;
        let encrypted = client
            .encrypt(&EncryptionInput::new(U256::from(5u8), EncryptedType::Euint8, CONTRACT))
            .await
            .unwrap();

        let payload = EncryptedInput {
            data: encrypted.data.clone(),
            user: DEV_ADDRESS,
        };
        let hash = payload.eip712_signing_hash(&input_verifier_domain(31337, CONTRACT));
        let sig = Signature::try_from(encrypted.signature.as_ref()).unwrap();
        assert_eq!(sig.recover_address_from_prehash(&hash).unwrap(), DEV_ADDRESS);
    }

    #[tokio::test]
    async fn explicit_user_overrides_signer_address() {
        let (client, _runtime) = ready_client().await;
        let other = address!("1111111111111111111111111111111111111111");
        let encrypted = client
            .encrypt(&EncryptionInput::new(U256::from(5u8), EncryptedType::Euint8, CONTRACT).for_user(other))
            .await
            .unwrap();

        let payload = EncryptedInput {
            data: encrypted.data,
            user: other,
        };
        let hash = payload.eip712_signing_hash(&input_verifier_domain(31337, CONTRACT));
        let sig = Signature::try_from(encrypted.signature.as_ref()).unwrap();
        assert_eq!(sig.recover_address_from_prehash(&hash).unwrap(), DEV_ADDRESS);
    }

    #[tokio::test]
    async fn encrypt_without_any_address_fails() {
        let runtime = MockRuntime::new();
        let cfg = SessionConfig::new(31337).with_rpc_url("http://localhost:8545".parse().unwrap());
        let client = FhevmClient::new(cfg, Arc::new(runtime.clone()));
        client.initialize().await.unwrap();

        let input = EncryptionInput::new(U256::from(1u8), EncryptedType::Euint8, CONTRACT);
        assert_eq!(client.encrypt(&input).await, Err(FhevmError::MissingAddress));
        assert_eq!(runtime.encrypt_calls(), 0);

        // An explicit user still needs a signer for the authorization.
        let input = input.for_user(DEV_ADDRESS);
        assert_eq!(client.encrypt(&input).await, Err(FhevmError::MissingSigner));
    }

    #[tokio::test]
    async fn failed_handle_degrades_to_zero() {
        let (client, runtime) = ready_client().await;

        let mut handles = Vec::new();
        for v in [10u8, 20, 30] {
            let encrypted = client
                .encrypt(&EncryptionInput::new(U256::from(v), EncryptedType::Euint8, CONTRACT))
                .await
                .unwrap();
            handles.push(encrypted.handle.unwrap());
        }
        runtime.fail_handle(handles[1]);

        let values = client
            .decrypt(&DecryptionRequest {
                contract_address: CONTRACT,
                handles: handles.clone(),
            })
            .await
            .unwrap();
        assert_eq!(values, vec![U256::from(10u8), U256::ZERO, U256::from(30u8)]);

        let detailed = client
            .decrypt_detailed(&DecryptionRequest {
                contract_address: CONTRACT,
                handles: handles.clone(),
            })
            .await
            .unwrap();
        assert_eq!(detailed.len(), 3);
        assert_eq!(detailed[1].handle, handles[1]);
    }

    #[tokio::test]
    async fn reencryption_signature_uses_session_key() {
        let (client, _runtime) = ready_client().await;
        let handle = B256::repeat_byte(0xab);

        let signature = client
            .create_reencryption_request(CONTRACT, handle)
            .await
            .unwrap();

        let payload = Reencryption {
            publicKey: client.public_key().unwrap(),
            handle,
        };
        let hash = payload.eip712_signing_hash(&reencryption_domain(31337, CONTRACT));
        let sig = Signature::try_from(signature.as_ref()).unwrap();
        assert_eq!(sig.recover_address_from_prehash(&hash).unwrap(), DEV_ADDRESS);
    }

    #[tokio::test]
    async fn reencryption_requires_signer() {
        let cfg = SessionConfig::new(31337).with_rpc_url("http://localhost:8545".parse().unwrap());
        let client = FhevmClient::new(cfg, Arc::new(MockRuntime::new()));
        client.initialize().await.unwrap();
        assert_eq!(
            client.create_reencryption_request(CONTRACT, B256::ZERO).await,
            Err(FhevmError::MissingSigner)
        );
    }

    #[test]
    fn reset_on_uninitialized_session_is_noop() {
        let client = FhevmClient::new(config(), Arc::new(MockRuntime::new()));
        client.reset();
        client.reset();
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn reset_clears_state_and_allows_reinitialize() {
        let (client, runtime) = ready_client().await;
        client.reset();
        assert!(!client.is_initialized());
        assert!(client.public_key().is_none());

        client.initialize().await.unwrap();
        assert!(client.is_initialized());
        assert_eq!(runtime.instances_created(), 2);
    }

    #[tokio::test]
    async fn reset_during_decrypt_marks_result_stale() {
        let (client, runtime) = ready_client().await;
        let client = Arc::new(client);
        let encrypted = client
            .encrypt(&EncryptionInput::new(U256::from(3u8), EncryptedType::Euint8, CONTRACT))
            .await
            .unwrap();
        runtime.set_gateway_delay(Duration::from_millis(50));

        let task = {
            let client = Arc::clone(&client);
            let handle = encrypted.handle.unwrap();
            tokio::spawn(async move {
                client
                    .decrypt(&DecryptionRequest {
                        contract_address: CONTRACT,
                        handles: vec![handle],
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        client.reset();

        assert_eq!(task.await.unwrap(), Err(FhevmError::SessionReset));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reset_racing_the_final_store_wins() {
        let runtime = MockRuntime::new();
        runtime.set_gateway_delay(Duration::from_millis(50));
        let client = Arc::new(FhevmClient::new(config(), Arc::new(runtime)));

        let init = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.initialize().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Park initialize on the slot after its gateway round-trip, then land
        // the generation bump of a reset before releasing it.
        let slot = client.session.write().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        client.generation.fetch_add(1, Ordering::SeqCst);
        drop(slot);

        assert_eq!(init.await.unwrap(), Err(FhevmError::SessionReset));
        assert!(!client.is_initialized());
    }
}
