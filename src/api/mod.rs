// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{ComputeRequest, DecryptRequest, EncryptRequest, FheStatus, RegisterKeyRequest},
    state::AppState,
};

pub mod fhe;
pub mod health;
pub mod keys;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/fhe", get(fhe::status).post(fhe::echo))
        .route("/fhe/encrypt", post(fhe::encrypt))
        .route("/fhe/decrypt", post(fhe::decrypt))
        .route("/fhe/compute", post(fhe::compute))
        .route("/keys", get(keys::get_public_key).post(keys::register_key))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        fhe::status,
        fhe::echo,
        fhe::encrypt,
        fhe::decrypt,
        fhe::compute,
        keys::get_public_key,
        keys::register_key,
        health::health
    ),
    components(
        schemas(
            FheStatus,
            EncryptRequest,
            DecryptRequest,
            ComputeRequest,
            RegisterKeyRequest,
            health::HealthResponse
        )
    ),
    tags(
        (name = "FHE", description = "Encryption, decryption and computation stubs"),
        (name = "Keys", description = "Reencryption public keys"),
        (name = "Health", description = "Liveness")
    )
)]
struct ApiDoc;
