//! # REST API
//!
//! Builds the axum router that exposes the verifier/builder service over
//! HTTP. All endpoints share application state through axum's `State`
//! extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Description                               |
//! |--------|----------------------|-------------------------------------------|
//! | GET    | `/health`            | Liveness probe                            |
//! | POST   | `/v1/vaults`         | Register a vault definition               |
//! | POST   | `/v1/vaults/inspect` | Commitment and selector table, no storage |
//! | POST   | `/v1/evaluate`       | Verify a proposal at the current tip      |
//! | POST   | `/v1/build`          | Plan and converge an unsigned spend       |
//! | POST   | `/v1/submit`         | Verify and broadcast a signed proposal    |
//!
//! Rejected proposals answer `422` with the failure class; a lost UTXO race
//! answers `409`.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vaultline_contracts::{BuildRequest, Evaluation, SpendFunction, Vault};
use vaultline_protocol::funds::FundsError;
use vaultline_protocol::policy::FailureClass;
use vaultline_protocol::transaction::TransactionProposal;
use vaultline_protocol::value::LockingCommitment;

use crate::service::{ServiceError, VaultService};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub service: Arc<VaultService>,
}

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/vaults", post(register_handler))
        .route("/v1/vaults/inspect", post(inspect_handler))
        .route("/v1/evaluate", post(evaluate_handler))
        .route("/v1/build", post(build_handler))
        .route("/v1/submit", post(submit_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub proposal: TransactionProposal,
}

/// Body of `POST /v1/build`: the vault, the function, and its parameters.
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildBody {
    pub vault: LockingCommitment,
    pub function: SpendFunction,
    #[serde(default)]
    pub request: BuildRequest,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub accepted: bool,
    pub evaluations: Vec<Evaluation>,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Set when a policy check rejected the proposal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<FailureClass>,
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::UnknownVault { .. } => StatusCode::NOT_FOUND,
            ServiceError::NoSpendableUtxo { .. } | ServiceError::RetriesExhausted { .. } => {
                StatusCode::CONFLICT
            }
            ServiceError::Vault(_) | ServiceError::Signing(_) => StatusCode::BAD_REQUEST,
            ServiceError::Policy(_) | ServiceError::Build(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Funds(e) => match e {
                FundsError::InputSpent { .. } => StatusCode::CONFLICT,
                FundsError::NotFound { .. } | FundsError::Rejected { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                FundsError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let class = match &self {
            ServiceError::Policy(e) => Some(e.class()),
            _ => None,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                class,
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "vaults": state.service.vault_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /v1/vaults` — validate and register a definition.
async fn register_handler(
    State(state): State<AppState>,
    Json(vault): Json<Vault>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.service.register(vault)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// `POST /v1/vaults/inspect` — what a definition commits to, without
/// registering it.
async fn inspect_handler(Json(vault): Json<Vault>) -> Result<impl IntoResponse, ServiceError> {
    vault.validate()?;
    Ok(Json(crate::service::VaultSummary::of(&vault)))
}

/// `POST /v1/evaluate`
async fn evaluate_handler(
    State(state): State<AppState>,
    Json(body): Json<ProposalRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let evaluations = state.service.evaluate(&body.proposal).await?;
    Ok(Json(EvaluateResponse {
        accepted: true,
        evaluations,
    }))
}

/// `POST /v1/build`
async fn build_handler(
    State(state): State<AppState>,
    Json(body): Json<BuildBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let built = state
        .service
        .build(&body.vault, body.function, &body.request)
        .await?;
    Ok(Json(built))
}

/// `POST /v1/submit`
async fn submit_handler(
    State(state): State<AppState>,
    Json(body): Json<ProposalRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state.service.submit(&body.proposal).await?;
    Ok(Json(receipt))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
