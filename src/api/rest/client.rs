use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::lifecycle;
use crate::matching::queue::enqueue_announcement;
use crate::models::announcement::{Announcement, AnnouncementStatus, Priority};
use crate::models::delivery::{Delivery, DeliveryRating, DeliveryStatus};
use crate::models::storage::{BoxRental, StorageBox};
use crate::models::user::{GeoPoint, UserRole};
use crate::payments;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/client/announcements", post(create_announcement))
        .route("/client/announcements/:id", get(get_announcement))
        .route("/client/deliveries/:id", get(get_delivery))
        .route("/client/deliveries/:id/cancel", post(cancel_delivery))
        .route("/client/deliveries/:id/rate", post(rate_delivery))
        .route("/client/storage-boxes", get(list_boxes))
        .route("/client/storage-boxes/:id/rent", post(rent_box))
        .route(
            "/client/storage-boxes/rentals/:id/confirm-payment",
            post(confirm_rental_payment),
        )
}

#[derive(Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub priority: Priority,
    pub fee: Decimal,
}

async fn create_announcement(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> Result<Json<Announcement>, AppError> {
    auth.require_role(UserRole::Client)?;

    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title cannot be empty".to_string()));
    }

    if payload.fee <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "fee must be greater than zero".to_string(),
        ));
    }

    let announcement = Announcement {
        id: Uuid::new_v4(),
        client_id: auth.id(),
        title: payload.title,
        pickup_address: payload.pickup_address,
        delivery_address: payload.delivery_address,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        priority: payload.priority,
        fee: payload.fee,
        status: AnnouncementStatus::Published,
        created_at: Utc::now(),
    };

    state
        .store
        .announcements
        .insert(announcement.id, announcement.clone());
    enqueue_announcement(&state, announcement.clone()).await?;

    Ok(Json(announcement))
}

async fn get_announcement(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Announcement>, AppError> {
    auth.require_role(UserRole::Client)?;

    let announcement = state
        .store
        .announcements
        .get(&id)
        .filter(|a| a.client_id == auth.id())
        .map(|a| a.clone())
        .ok_or_else(|| AppError::NotFound(format!("announcement {id} not found")))?;

    Ok(Json(announcement))
}

/// The client's view of a delivery is the only place the confirmation code
/// is disclosed.
#[derive(Serialize)]
pub struct ClientDeliveryResponse {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub confirmation_code: String,
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientDeliveryResponse>, AppError> {
    auth.require_role(UserRole::Client)?;

    let delivery = state
        .store
        .deliveries
        .get(&id)
        .filter(|d| d.client_id == auth.id())
        .map(|d| d.clone())
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    let confirmation_code = delivery.confirmation_code.clone();
    Ok(Json(ClientDeliveryResponse {
        delivery,
        confirmation_code,
    }))
}

async fn cancel_delivery(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    auth.require_role(UserRole::Client)?;
    let delivery = lifecycle::cancel(&state, id, auth.id())?;
    Ok(Json(delivery))
}

#[derive(Deserialize)]
pub struct RateDeliveryRequest {
    pub rating: u8,
    pub comment: Option<String>,
}

async fn rate_delivery(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateDeliveryRequest>,
) -> Result<Json<DeliveryRating>, AppError> {
    auth.require_role(UserRole::Client)?;

    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let delivery = state
        .store
        .deliveries
        .get(&id)
        .filter(|d| d.client_id == auth.id())
        .map(|d| d.clone())
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    if delivery.status != DeliveryStatus::Delivered {
        return Err(AppError::Conflict(
            "only completed deliveries can be rated".to_string(),
        ));
    }

    if state.store.rating_exists(id, auth.id()) {
        return Err(AppError::Conflict(
            "this delivery has already been rated".to_string(),
        ));
    }

    let rating = DeliveryRating {
        id: Uuid::new_v4(),
        delivery_id: id,
        rated_by: auth.id(),
        target_id: delivery.deliverer_id,
        rating: payload.rating,
        comment: payload.comment,
        created_at: Utc::now(),
    };
    state.store.ratings.insert(rating.id, rating.clone());

    if let Some(mut target) = state.store.users.get_mut(&delivery.deliverer_id) {
        target.record_rating(payload.rating);
    }

    Ok(Json(rating))
}

async fn list_boxes(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<StorageBox>>, AppError> {
    auth.require_role(UserRole::Client)?;

    let boxes = state
        .store
        .boxes
        .iter()
        .filter(|entry| entry.is_available)
        .map(|entry| entry.clone())
        .collect();
    Ok(Json(boxes))
}

async fn rent_box(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BoxRental>, AppError> {
    auth.require_role(UserRole::Client)?;
    let rental = payments::rent_box(&state, auth.id(), id).await?;
    Ok(Json(rental))
}

async fn confirm_rental_payment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BoxRental>, AppError> {
    auth.require_role(UserRole::Client)?;
    let rental = payments::confirm_rental_payment(&state, auth.id(), id).await?;
    Ok(Json(rental))
}
