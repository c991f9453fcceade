// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed wrapper for the Pet DNA Matching contract.
//!
//! Health score, genetic markers and temperament are submitted encrypted;
//! everything else is plaintext.

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{address, Address, U256},
};

use crate::fhevm::{
    parse_abi, ChainError, ContractBackend, ContractEvent, EncryptedCall, EncryptedIndex,
    EncryptedType, FhevmContract, FhevmError, SubscriptionId, TransactionOptions,
};

/// Deployed contract on Sepolia.
pub const PET_DNA_MATCHING_ADDRESS: Address = address!("C16ebe7Cb0A3B057437B8A3568d6Df2FB02812d1");

/// Human-readable ABI. Encrypted parameters are `bytes`.
pub const PET_DNA_MATCHING_ABI: [&str; 12] = [
    "function registerPet(string _name, string _species, string _breed, uint256 _birthYear, bytes _healthScore, bytes _geneticMarker1, bytes _geneticMarker2, bytes _geneticMarker3, bytes _temperament)",
    "function requestMatching(uint256 _petId1, uint256 _petId2) payable",
    "function setBreedingStatus(uint256 _petId, bool _available)",
    "function getPetInfo(uint256 _petId) view returns (string name, string species, string breed, uint256 birthYear, address petOwner, bool availableForBreeding)",
    "function getOwnerPets(address _owner) view returns (uint256[])",
    "function getTotalPets() view returns (uint256)",
    "function matchingCost() view returns (uint256)",
    "function owner() view returns (address)",
    "event PetRegistered(uint256 indexed petId, address indexed owner, string name)",
    "event MatchingRequested(uint256 indexed petId1, uint256 indexed petId2, uint256 requestId)",
    "event MatchingCompleted(uint256 indexed petId1, uint256 indexed petId2, uint8 compatibilityScore)",
    "event BreedingStatusChanged(uint256 indexed petId, bool available)",
];

pub fn pet_dna_matching_abi() -> Result<JsonAbi, ChainError> {
    parse_abi(PET_DNA_MATCHING_ABI)
}

/// A pet to register. Health, markers and temperament are encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetRegistration {
    pub name: String,
    pub species: String,
    pub breed: String,
    pub birth_year: u64,
    pub health_score: u8,
    pub genetic_markers: [u16; 3],
    pub temperament: u8,
}

/// Public pet record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetInfo {
    pub name: String,
    pub species: String,
    pub breed: String,
    pub birth_year: U256,
    pub owner: Address,
    pub available_for_breeding: bool,
}

/// Events emitted by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PetEventKind {
    PetRegistered,
    MatchingRequested,
    MatchingCompleted,
    BreedingStatusChanged,
}

impl PetEventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            PetEventKind::PetRegistered => "PetRegistered",
            PetEventKind::MatchingRequested => "MatchingRequested",
            PetEventKind::MatchingCompleted => "MatchingCompleted",
            PetEventKind::BreedingStatusChanged => "BreedingStatusChanged",
        }
    }
}

/// A decoded contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetEvent {
    PetRegistered {
        pet_id: U256,
        owner: Address,
        name: String,
    },
    MatchingRequested {
        pet_id1: U256,
        pet_id2: U256,
        request_id: U256,
    },
    MatchingCompleted {
        pet_id1: U256,
        pet_id2: U256,
        compatibility_score: u8,
    },
    BreedingStatusChanged {
        pet_id: U256,
        available: bool,
    },
}

impl PetEvent {
    /// Decode a generic event. Returns `None` for other events or
    /// mismatched arguments.
    pub fn from_contract_event(event: &ContractEvent) -> Option<Self> {
        let args = event.args.as_slice();
        match (event.name.as_str(), args) {
            ("PetRegistered", [id, owner, name]) => Some(PetEvent::PetRegistered {
                pet_id: id.as_uint()?.0,
                owner: owner.as_address()?,
                name: name.as_str()?.to_string(),
            }),
            ("MatchingRequested", [a, b, request]) => Some(PetEvent::MatchingRequested {
                pet_id1: a.as_uint()?.0,
                pet_id2: b.as_uint()?.0,
                request_id: request.as_uint()?.0,
            }),
            ("MatchingCompleted", [a, b, score]) => Some(PetEvent::MatchingCompleted {
                pet_id1: a.as_uint()?.0,
                pet_id2: b.as_uint()?.0,
                compatibility_score: u8::try_from(score.as_uint()?.0).ok()?,
            }),
            ("BreedingStatusChanged", [id, available]) => Some(PetEvent::BreedingStatusChanged {
                pet_id: id.as_uint()?.0,
                available: available.as_bool()?,
            }),
            _ => None,
        }
    }
}

/// Pet DNA Matching contract bound to a session.
pub struct PetDnaMatching<B> {
    contract: FhevmContract<B>,
}

impl<B: ContractBackend> PetDnaMatching<B> {
    pub fn new(contract: FhevmContract<B>) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &FhevmContract<B> {
        &self.contract
    }

    pub async fn register_pet(&self, pet: &PetRegistration) -> Result<EncryptedCall, FhevmError> {
        let [m1, m2, m3] = pet.genetic_markers;
        let args = [
            DynSolValue::String(pet.name.clone()),
            DynSolValue::String(pet.species.clone()),
            DynSolValue::String(pet.breed.clone()),
            uint(U256::from(pet.birth_year)),
            uint(U256::from(pet.health_score)),
            uint(U256::from(m1)),
            uint(U256::from(m2)),
            uint(U256::from(m3)),
            uint(U256::from(pet.temperament)),
        ];
        let encrypted = [
            EncryptedIndex::new(4, EncryptedType::Euint8),
            EncryptedIndex::new(5, EncryptedType::Euint16),
            EncryptedIndex::new(6, EncryptedType::Euint16),
            EncryptedIndex::new(7, EncryptedType::Euint16),
            EncryptedIndex::new(8, EncryptedType::Euint8),
        ];
        self.contract
            .call_with_encryption("registerPet", &args, &encrypted)
            .await
    }

    /// Request a compatibility match, paying `payment` (see [`Self::matching_cost`]).
    pub async fn request_matching(
        &self,
        pet_id1: U256,
        pet_id2: U256,
        payment: U256,
    ) -> Result<EncryptedCall, FhevmError> {
        let options = TransactionOptions {
            value: Some(payment),
            ..Default::default()
        };
        self.contract
            .call_with_encryption_and_options(
                "requestMatching",
                &[uint(pet_id1), uint(pet_id2)],
                &[],
                &options,
            )
            .await
    }

    pub async fn set_breeding_status(
        &self,
        pet_id: U256,
        available: bool,
    ) -> Result<EncryptedCall, FhevmError> {
        self.contract
            .call_with_encryption(
                "setBreedingStatus",
                &[uint(pet_id), DynSolValue::Bool(available)],
                &[],
            )
            .await
    }

    pub async fn get_pet_info(&self, pet_id: U256) -> Result<PetInfo, FhevmError> {
        let outputs = self.contract.view("getPetInfo", &[uint(pet_id)]).await?;
        let fields = match outputs.as_slice() {
            [DynSolValue::Tuple(inner)] => inner.as_slice(),
            other => other,
        };

        let [name, species, breed, birth_year, owner, available] = fields else {
            return Err(unexpected("getPetInfo", &outputs));
        };
        let decode = || {
            Some(PetInfo {
                name: name.as_str()?.to_string(),
                species: species.as_str()?.to_string(),
                breed: breed.as_str()?.to_string(),
                birth_year: birth_year.as_uint()?.0,
                owner: owner.as_address()?,
                available_for_breeding: available.as_bool()?,
            })
        };
        decode().ok_or_else(|| unexpected("getPetInfo", &outputs))
    }

    pub async fn get_owner_pets(&self, owner: Address) -> Result<Vec<U256>, FhevmError> {
        let outputs = self
            .contract
            .view("getOwnerPets", &[DynSolValue::Address(owner)])
            .await?;
        match outputs.as_slice() {
            [DynSolValue::Array(ids)] => ids
                .iter()
                .map(|id| id.as_uint().map(|(v, _)| v))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| unexpected("getOwnerPets", &outputs)),
            _ => Err(unexpected("getOwnerPets", &outputs)),
        }
    }

    pub async fn get_total_pets(&self) -> Result<U256, FhevmError> {
        self.single_uint("getTotalPets").await
    }

    pub async fn matching_cost(&self) -> Result<U256, FhevmError> {
        self.single_uint("matchingCost").await
    }

    pub async fn owner(&self) -> Result<Address, FhevmError> {
        let outputs = self.contract.view("owner", &[]).await?;
        outputs
            .first()
            .and_then(DynSolValue::as_address)
            .ok_or_else(|| unexpected("owner", &outputs))
    }

    /// Listen for one kind of event. Undecodable events are skipped.
    pub fn on<F>(&self, kind: PetEventKind, listener: F) -> Result<SubscriptionId, FhevmError>
    where
        F: Fn(PetEvent) + Send + Sync + 'static,
    {
        self.contract.on(kind.as_str(), move |event| {
            match PetEvent::from_contract_event(&event) {
                Some(decoded) => listener(decoded),
                None => tracing::warn!(event = %event.name, "Skipping undecodable pet event"),
            }
        })
    }

    pub fn off(&self, kind: PetEventKind, id: Option<SubscriptionId>) -> usize {
        self.contract.off(kind.as_str(), id)
    }

    async fn single_uint(&self, function: &str) -> Result<U256, FhevmError> {
        let outputs = self.contract.view(function, &[]).await?;
        outputs
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value)
            .ok_or_else(|| unexpected(function, &outputs))
    }
}

fn uint(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

fn unexpected(function: &str, outputs: &[DynSolValue]) -> FhevmError {
    ChainError::Abi(format!("Unexpected output from {function}: {outputs:?}")).into()
}
