// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    api::fhe::{invalid_body, required},
    error::ApiError,
    fhevm::helpers::{from_hex, parse_address, to_hex},
    models::{ApiResponse, PublicKeyResponse, RegisterKeyRequest, RegisterKeyResponse},
    state::AppState,
};

/// Returned until a real network key is wired in, and for users that never
/// registered one.
pub fn placeholder_public_key() -> String {
    to_hex(&[0u8; 32])
}

#[utoipa::path(
    get,
    path = "/api/keys",
    tag = "Keys",
    responses((status = 200, body = ApiResponse<PublicKeyResponse>))
)]
pub async fn get_public_key(State(state): State<AppState>) -> Json<ApiResponse<PublicKeyResponse>> {
    Json(ApiResponse::ok(PublicKeyResponse {
        public_key: placeholder_public_key(),
        chain_id: state.chain_id,
    }))
}

#[utoipa::path(
    post,
    path = "/api/keys",
    request_body = RegisterKeyRequest,
    tag = "Keys",
    responses(
        (status = 200, body = ApiResponse<RegisterKeyResponse>),
        (status = 400, description = "Missing or invalid address or key")
    )
)]
pub async fn register_key(
    State(state): State<AppState>,
    payload: Result<Json<RegisterKeyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RegisterKeyResponse>>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let Some(raw_address) = required(&request.address) else {
        return Err(ApiError::bad_request("Address required"));
    };
    let address = parse_address(raw_address)?;

    let public_key = match required(&request.public_key) {
        Some(raw_key) => {
            let key = to_hex(&from_hex(raw_key)?);
            state.keys.write().await.insert(address, key.clone());
            tracing::info!(address = %address, "Registered reencryption key");
            key
        }
        None => state
            .keys
            .read()
            .await
            .get(&address)
            .cloned()
            .unwrap_or_else(placeholder_public_key),
    };

    Ok(Json(ApiResponse::ok(RegisterKeyResponse {
        address: address.to_string(),
        public_key,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    const USER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn request(address: Option<&str>, public_key: Option<&str>) -> RegisterKeyRequest {
        RegisterKeyRequest {
            address: address.map(str::to_string),
            public_key: public_key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn public_key_uses_configured_chain() {
        let Json(response) = get_public_key(State(AppState::new(31337))).await;
        assert_eq!(response.data.chain_id, 31337);
        assert_eq!(response.data.public_key, format!("0x{}", "0".repeat(64)));
    }

    #[tokio::test]
    async fn register_requires_valid_address() {
        let state = AppState::default();

        let err = register_key(State(state.clone()), Ok(Json(request(None, None))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Address required");

        let err = register_key(State(state), Ok(Json(request(Some("0x12"), None))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn registered_key_is_returned_later() {
        let state = AppState::default();

        let Json(response) = register_key(State(state.clone()), Ok(Json(request(Some(USER), None))))
            .await
            .unwrap();
        assert_eq!(response.data.public_key, placeholder_public_key());

        let Json(response) = register_key(
            State(state.clone()),
            Ok(Json(request(Some(USER), Some("0xABCD")))),
        )
        .await
        .unwrap();
        assert_eq!(response.data.public_key, "0xabcd");

        let Json(response) = register_key(State(state.clone()), Ok(Json(request(Some(USER), None))))
            .await
            .unwrap();
        assert_eq!(response.data.public_key, "0xabcd");
        assert_eq!(state.keys.read().await.len(), 1);
    }

    #[tokio::test]
    async fn register_rejects_non_hex_key() {
        let err = register_key(
            State(AppState::default()),
            Ok(Json(request(Some(USER), Some("not-hex")))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
