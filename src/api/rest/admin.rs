use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::ledger::{self, WithdrawalDecision};
use crate::models::document::Document;
use crate::models::storage::StorageBox;
use crate::models::user::UserRole;
use crate::models::wallet::{OperationStatus, WalletOperation};
use crate::state::AppState;
use crate::verification::{self, VerificationStats};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/withdrawals", get(list_withdrawals))
        .route("/admin/withdrawals/:id/process", put(process_withdrawal))
        .route("/admin/documents/:id/approve", put(approve_document))
        .route("/admin/documents/:id/reject", put(reject_document))
        .route("/admin/verifications/stats", get(verification_stats))
        .route("/admin/storage-boxes", post(create_storage_box))
}

#[derive(Deserialize)]
pub struct WithdrawalListQuery {
    pub status: Option<OperationStatus>,
}

async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<WithdrawalListQuery>,
) -> Result<Json<Vec<WalletOperation>>, AppError> {
    auth.require_role(UserRole::Admin)?;
    Ok(Json(ledger::list_withdrawals(&state.store, query.status)))
}

#[derive(Deserialize)]
pub struct ProcessWithdrawalRequest {
    pub decision: WithdrawalDecision,
    pub notes: Option<String>,
}

async fn process_withdrawal(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProcessWithdrawalRequest>,
) -> Result<Json<WalletOperation>, AppError> {
    auth.require_role(UserRole::Admin)?;
    let operation =
        ledger::process_withdrawal(&state, id, payload.decision, auth.id(), payload.notes)?;
    Ok(Json(operation))
}

async fn approve_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    auth.require_role(UserRole::Admin)?;
    let document = verification::approve_document(&state, id, auth.id())?;
    Ok(Json(document))
}

#[derive(Deserialize)]
pub struct RejectDocumentRequest {
    pub reason: String,
}

async fn reject_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectDocumentRequest>,
) -> Result<Json<Document>, AppError> {
    auth.require_role(UserRole::Admin)?;
    let document = verification::reject_document(&state, id, auth.id(), &payload.reason)?;
    Ok(Json(document))
}

async fn verification_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<VerificationStats>, AppError> {
    auth.require_role(UserRole::Admin)?;
    Ok(Json(verification::verification_stats(&state.store)))
}

#[derive(Deserialize)]
pub struct CreateStorageBoxRequest {
    pub code: String,
    pub monthly_price: Decimal,
}

async fn create_storage_box(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateStorageBoxRequest>,
) -> Result<Json<StorageBox>, AppError> {
    auth.require_role(UserRole::Admin)?;

    if payload.code.trim().is_empty() {
        return Err(AppError::BadRequest("code cannot be empty".to_string()));
    }

    if payload.monthly_price <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "monthly_price must be greater than zero".to_string(),
        ));
    }

    let storage_box = StorageBox {
        id: Uuid::new_v4(),
        code: payload.code,
        monthly_price: payload.monthly_price,
        is_available: true,
    };
    state
        .store
        .boxes
        .insert(storage_box.id, storage_box.clone());

    Ok(Json(storage_box))
}
