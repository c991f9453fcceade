// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stub FHE endpoints. Inputs are validated with the SDK's own parsers, but
//! no ciphertext is produced or decrypted server-side.

use alloy::primitives::U256;
use axum::{extract::rejection::JsonRejection, Json};
use serde_json::Value;

use crate::{
    error::ApiError,
    fhevm::{
        helpers::{parse_address, parse_value},
        EncryptedType,
    },
    models::{
        ApiResponse, ComputeRequest, ComputeResponse, DecryptRequest, DecryptResponse,
        EncryptRequest, EncryptResponse, FheStatus,
    },
};

pub const FHE_API_VERSION: &str = "1.0.0";

const MISSING_PARAMETERS: &str = "Missing required parameters";

pub(crate) fn invalid_body(rejection: JsonRejection) -> ApiError {
    tracing::debug!(error = %rejection.body_text(), "Rejected request body");
    ApiError::bad_request("Invalid request")
}

/// Non-blank string field.
pub(crate) fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn plaintext(value: &Value) -> Result<U256, ApiError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid value: {n}"))),
        Value::String(s) => Ok(parse_value(s)?),
        Value::Bool(b) => Ok(U256::from(u8::from(*b))),
        _ => Err(ApiError::bad_request("Invalid value")),
    }
}

#[utoipa::path(
    get,
    path = "/api/fhe",
    tag = "FHE",
    responses((status = 200, body = FheStatus))
)]
pub async fn status() -> Json<FheStatus> {
    Json(FheStatus {
        message: "FHE API endpoint".to_string(),
        status: "ready".to_string(),
        version: FHE_API_VERSION.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/api/fhe",
    tag = "FHE",
    responses(
        (status = 200, description = "Request body echoed back as data"),
        (status = 400, description = "Body is not valid JSON")
    )
)]
pub async fn echo(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let Json(body) = payload.map_err(invalid_body)?;
    Ok(Json(ApiResponse::ok(body)))
}

#[utoipa::path(
    post,
    path = "/api/fhe/encrypt",
    request_body = EncryptRequest,
    tag = "FHE",
    responses(
        (status = 200, body = ApiResponse<EncryptResponse>),
        (status = 400, description = "Missing or invalid value, type or contract address")
    )
)]
pub async fn encrypt(
    payload: Result<Json<EncryptRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<EncryptResponse>>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let value = request.value.as_ref().filter(|v| !v.is_null());
    let (Some(value), Some(raw_type), Some(contract)) = (
        value,
        required(&request.encrypted_type),
        required(&request.contract_address),
    ) else {
        return Err(ApiError::bad_request(MISSING_PARAMETERS));
    };

    let encrypted_type: EncryptedType = raw_type.parse()?;
    encrypted_type.validate(plaintext(value)?)?;
    let contract = parse_address(contract)?;

    tracing::debug!(%encrypted_type, contract = %contract, "Accepted encryption request");

    Ok(Json(ApiResponse::ok(EncryptResponse {
        encrypted: true,
        encrypted_type: encrypted_type.to_string(),
        contract_address: contract.to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/fhe/decrypt",
    request_body = DecryptRequest,
    tag = "FHE",
    responses(
        (status = 200, body = ApiResponse<DecryptResponse>),
        (status = 400, description = "Missing handle or contract address"),
        (status = 401, description = "Missing signature")
    )
)]
pub async fn decrypt(
    payload: Result<Json<DecryptRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DecryptResponse>>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(handle), Some(contract)) = (
        required(&request.handle),
        required(&request.contract_address),
    ) else {
        return Err(ApiError::bad_request(MISSING_PARAMETERS));
    };
    if required(&request.signature).is_none() {
        return Err(ApiError::unauthorized("Missing signature"));
    }
    let contract = parse_address(contract)?;

    Ok(Json(ApiResponse::ok(DecryptResponse {
        decrypted: true,
        handle: handle.to_string(),
        contract_address: contract.to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/fhe/compute",
    request_body = ComputeRequest,
    tag = "FHE",
    responses(
        (status = 200, body = ApiResponse<ComputeResponse>),
        (status = 400, description = "Missing operation or operands")
    )
)]
pub async fn compute(
    payload: Result<Json<ComputeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ComputeResponse>>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(operation), Some(_)) = (required(&request.operation), request.operands.as_ref())
    else {
        return Err(ApiError::bad_request(MISSING_PARAMETERS));
    };

    Ok(Json(ApiResponse::ok(ComputeResponse {
        operation: operation.to_string(),
        computed: true,
        result: "encrypted_result".to_string(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    const CONTRACT: &str = "0xc16e2d5d6a4b5e1c8f7a9b3d2e1f0a9b8c7d12d1";

    fn encrypt_request(value: Value, ty: &str) -> EncryptRequest {
        EncryptRequest {
            value: Some(value),
            encrypted_type: Some(ty.to_string()),
            contract_address: Some(CONTRACT.to_string()),
        }
    }

    #[tokio::test]
    async fn status_reports_ready() {
        let Json(status) = status().await;
        assert_eq!(status.status, "ready");
        assert_eq!(status.version, FHE_API_VERSION);
    }

    #[tokio::test]
    async fn echo_wraps_body() {
        let Json(response) = echo(Ok(Json(json!({"op": "add"})))).await.unwrap();
        assert!(response.success);
        assert_eq!(response.data, json!({"op": "add"}));
    }

    #[tokio::test]
    async fn encrypt_accepts_numbers_and_strings() {
        let Json(response) = encrypt(Ok(Json(encrypt_request(json!(42), "euint8"))))
            .await
            .unwrap();
        assert!(response.data.encrypted);
        assert_eq!(response.data.encrypted_type, "euint8");

        let Json(response) = encrypt(Ok(Json(encrypt_request(json!("0xffff"), "EUINT16"))))
            .await
            .unwrap();
        assert_eq!(response.data.encrypted_type, "euint16");
    }

    #[tokio::test]
    async fn encrypt_rejects_missing_and_invalid_fields() {
        let err = encrypt(Ok(Json(EncryptRequest::default()))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, MISSING_PARAMETERS);

        let err = encrypt(Ok(Json(encrypt_request(json!(256), "euint8"))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = encrypt(Ok(Json(encrypt_request(json!(1), "euint7"))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut bad_address = encrypt_request(json!(1), "ebool");
        bad_address.contract_address = Some("0x1234".to_string());
        let err = encrypt(Ok(Json(bad_address))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = encrypt(Ok(Json(encrypt_request(json!(-3), "euint8"))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn decrypt_requires_signature() {
        let mut request = DecryptRequest {
            handle: Some("0x01".to_string()),
            contract_address: Some(CONTRACT.to_string()),
            signature: None,
        };
        let err = decrypt(Ok(Json(request.clone()))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "Missing signature");

        request.signature = Some("0xsig".to_string());
        let Json(response) = decrypt(Ok(Json(request))).await.unwrap();
        assert!(response.data.decrypted);
        assert_eq!(response.data.handle, "0x01");
    }

    #[tokio::test]
    async fn decrypt_checks_fields_before_signature() {
        let request = DecryptRequest {
            handle: None,
            contract_address: Some(CONTRACT.to_string()),
            signature: None,
        };
        let err = decrypt(Ok(Json(request))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn compute_needs_operation_and_operands() {
        let err = compute(Ok(Json(ComputeRequest {
            operation: Some("add".to_string()),
            operands: None,
        })))
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let Json(response) = compute(Ok(Json(ComputeRequest {
            operation: Some("add".to_string()),
            operands: Some(vec![json!(1), json!(2)]),
        })))
        .await
        .unwrap();
        assert!(response.data.computed);
        assert_eq!(response.data.result, "encrypted_result");
    }
}
