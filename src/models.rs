// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the demo API. Field names are camelCase
//! on the wire. Request fields are optional so that a missing field produces
//! the documented 400 response instead of a deserialization rejection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Successful response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Service banner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FheStatus {
    pub message: String,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncryptRequest {
    /// Plaintext as a JSON number or a decimal/hex string.
    #[schema(value_type = Object)]
    pub value: Option<Value>,
    /// Encrypted type name, e.g. `euint8`.
    #[serde(rename = "type")]
    pub encrypted_type: Option<String>,
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncryptResponse {
    pub encrypted: bool,
    #[serde(rename = "type")]
    pub encrypted_type: String,
    pub contract_address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    pub handle: Option<String>,
    pub contract_address: Option<String>,
    /// Reencryption signature of the requesting user.
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecryptResponse {
    pub decrypted: bool,
    pub handle: String,
    pub contract_address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ComputeRequest {
    pub operation: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub operands: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComputeResponse {
    pub operation: String,
    pub computed: bool,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterKeyRequest {
    pub address: Option<String>,
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterKeyResponse {
    pub address: String,
    pub public_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_request_uses_wire_names() {
        let req: EncryptRequest = serde_json::from_str(
            r#"{"value":42,"type":"euint8","contractAddress":"0xabc"}"#,
        )
        .unwrap();
        assert_eq!(req.encrypted_type.as_deref(), Some("euint8"));
        assert_eq!(req.contract_address.as_deref(), Some("0xabc"));
        assert_eq!(req.value, Some(Value::from(42)));
    }

    #[test]
    fn envelope_serializes_success_flag() {
        let body = serde_json::to_value(ApiResponse::ok(PublicKeyResponse {
            public_key: "0x00".into(),
            chain_id: 1,
        }))
        .unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["chainId"], 1);
        assert_eq!(body["data"]["publicKey"], "0x00");
    }
}
