use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::ledger;
use crate::lifecycle;
use crate::models::delivery::{Delivery, TrackingEvent};
use crate::models::document::{Document, DocumentType};
use crate::models::user::{GeoPoint, UserAccount, UserRole};
use crate::models::wallet::WalletOperation;
use crate::state::AppState;
use crate::verification;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliverer/deliveries", get(list_deliveries))
        .route("/deliverer/deliveries/:id/pickup", post(pickup))
        .route("/deliverer/deliveries/:id/start", post(start))
        .route("/deliverer/deliveries/:id/complete", post(complete))
        .route("/deliveries/:id/tracking", get(tracking_history))
        .route("/deliverer/location", patch(update_location))
        .route("/deliverer/documents", post(submit_document))
        .route("/deliverer/wallet", get(wallet_summary))
        .route("/deliverer/wallet/withdrawals", post(request_withdrawal))
}

async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<Delivery>>, AppError> {
    auth.require_role(UserRole::Deliverer)?;
    Ok(Json(state.store.deliveries_for_deliverer(auth.id())))
}

#[derive(Deserialize, Default)]
pub struct TransitionRequest {
    pub location: Option<GeoPoint>,
}

async fn pickup(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<TransitionRequest>>,
) -> Result<Json<Delivery>, AppError> {
    auth.require_role(UserRole::Deliverer)?;
    let location = payload.and_then(|Json(body)| body.location);
    let delivery = lifecycle::pickup(&state, id, auth.id(), location)?;
    Ok(Json(delivery))
}

async fn start(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<TransitionRequest>>,
) -> Result<Json<Delivery>, AppError> {
    auth.require_role(UserRole::Deliverer)?;
    let location = payload.and_then(|Json(body)| body.location);
    let delivery = lifecycle::start(&state, id, auth.id(), location)?;
    Ok(Json(delivery))
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub confirmation_code: String,
    pub location: Option<GeoPoint>,
}

async fn complete(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<Delivery>, AppError> {
    auth.require_role(UserRole::Deliverer)?;
    let delivery = lifecycle::complete(
        &state,
        id,
        auth.id(),
        &payload.confirmation_code,
        payload.location,
    )?;
    Ok(Json(delivery))
}

/// The audit trail, visible to both parties of the delivery and to admins.
async fn tracking_history(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TrackingEvent>>, AppError> {
    let is_party = state
        .store
        .deliveries
        .get(&id)
        .map(|d| {
            d.client_id == auth.id()
                || d.deliverer_id == auth.id()
                || auth.account.role == UserRole::Admin
        })
        .unwrap_or(false);

    if !is_party {
        return Err(AppError::NotFound(format!("delivery {id} not found")));
    }

    Ok(Json(state.store.tracking_for(id)))
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<UserAccount>, AppError> {
    auth.require_role(UserRole::Deliverer)?;

    let mut user = state
        .store
        .users
        .get_mut(&auth.id())
        .ok_or(AppError::Unauthorized)?;
    user.location = Some(payload.location);

    Ok(Json(user.clone()))
}

#[derive(Deserialize)]
pub struct SubmitDocumentRequest {
    pub doc_type: DocumentType,
}

async fn submit_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<SubmitDocumentRequest>,
) -> Result<Json<Document>, AppError> {
    auth.require_any(&[UserRole::Deliverer, UserRole::Provider])?;
    let document = verification::submit_document(&state, &auth.account, payload.doc_type)?;
    Ok(Json(document))
}

async fn wallet_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ledger::WalletSummary>, AppError> {
    auth.require_any(&[UserRole::Deliverer, UserRole::Provider])?;
    Ok(Json(ledger::wallet_summary(&state.store, auth.id())))
}

#[derive(Deserialize)]
pub struct WithdrawalRequest {
    pub amount: Decimal,
}

async fn request_withdrawal(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<WithdrawalRequest>,
) -> Result<Json<WalletOperation>, AppError> {
    auth.require_any(&[UserRole::Deliverer, UserRole::Provider])?;
    let operation = ledger::request_withdrawal(&state, auth.id(), payload.amount)?;
    Ok(Json(operation))
}
