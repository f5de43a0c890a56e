use crate::errors::ApiError;
use crate::models::*;
use crate::state::AppState;
use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/circuits/:name/setup", post(setup_circuit))
        .route("/api/v1/circuits/:name/prove", post(prove))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/circuits", get(list_circuits))
        .route("/api/v1/circuits/:name/status", get(circuit_status))
        .route("/api/v1/circuits/:name/vk", get(get_vk))
        .route("/api/v1/circuits/:name/verify", post(verify))
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key == &*state.api_key {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!(path = %request.uri().path(), "unauthorized access attempt");
    Err(StatusCode::UNAUTHORIZED)
}

async fn list_circuits(State(state): State<AppState>) -> Result<Json<CircuitListResponse>, ApiError> {
    let mut circuits = Vec::new();
    for name in state.names() {
        circuits.push(CircuitSummary {
            name: name.to_string(),
            status: state.status(name).await?,
        });
    }
    Ok(Json(CircuitListResponse { circuits }))
}

async fn circuit_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CircuitSummary>, ApiError> {
    let status = state.status(&name).await?;
    Ok(Json(CircuitSummary { name, status }))
}

async fn setup_circuit(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SetupResponse>, ApiError> {
    state.setup(&name).await?;
    let vk = state.verifying_key(&name).await?;
    tracing::info!(circuit = %name, "circuit ready");
    Ok(Json(SetupResponse {
        name,
        vk_b64: base64::engine::general_purpose::STANDARD.encode(vk),
    }))
}

async fn get_vk(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<VkResponse>, ApiError> {
    let vk = state.verifying_key(&name).await?;
    Ok(Json(VkResponse {
        name,
        vk_b64: base64::engine::general_purpose::STANDARD.encode(vk),
    }))
}

async fn prove(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<ProveRequest>,
) -> Result<Json<ProveResponse>, ApiError> {
    let output = state.prove(&name, req.witness.to_string()).await?;
    Ok(Json(ProveResponse {
        proof_b64: output.proof.to_base64(),
        public_data: output.public_data,
    }))
}

async fn verify(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let proof = base64::engine::general_purpose::STANDARD
        .decode(req.proof_b64)
        .map_err(|_| ApiError::BadRequest("invalid proof_b64".to_string()))?;

    let response = match state.verify(&name, proof, req.public_data).await? {
        Ok(()) => VerifyResponse { ok: true, error: None },
        Err(reason) => {
            tracing::info!(circuit = %name, %reason, "proof rejected");
            VerifyResponse { ok: false, error: Some(reason) }
        }
    };
    Ok(Json(response))
}
