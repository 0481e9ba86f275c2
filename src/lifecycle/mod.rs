//! Delivery state machine.
//!
//! Legal path: ACCEPTED -> PICKED_UP -> IN_TRANSIT -> DELIVERED, plus the
//! client-initiated ACCEPTED -> CANCELLED edge. DELIVERED and CANCELLED are
//! terminal. Every transition re-checks the expected status inside the row
//! guard, so of two concurrent callers exactly one wins and the loser fails
//! the same way a wrong-state call does.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger;
use crate::models::announcement::AnnouncementStatus;
use crate::models::delivery::{Delivery, DeliveryStatus, TrackingEvent};
use crate::models::user::GeoPoint;
use crate::state::AppState;

/// Deliverer-facing preconditions (existence, ownership, current status) all
/// fail identically, so a caller probing someone else's delivery learns
/// nothing from the error shape.
fn not_eligible(delivery_id: Uuid) -> AppError {
    AppError::NotFound(format!("delivery {delivery_id} not found"))
}

pub fn pickup(
    state: &AppState,
    delivery_id: Uuid,
    deliverer_id: Uuid,
    location: Option<GeoPoint>,
) -> Result<Delivery, AppError> {
    let now = Utc::now();
    let (updated, event) = {
        let mut delivery = state
            .store
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| not_eligible(delivery_id))?;

        if delivery.deliverer_id != deliverer_id || delivery.status != DeliveryStatus::Accepted {
            return Err(not_eligible(delivery_id));
        }

        delivery.status = DeliveryStatus::PickedUp;
        delivery.picked_up_at = Some(now);

        let event = tracking_event(&delivery, "Colis récupéré", location, now);
        state.store.append_tracking(event.clone());
        (delivery.clone(), event)
    };

    publish(state, event);
    tracing::info!(delivery_id = %delivery_id, "delivery picked up");
    Ok(updated)
}

pub fn start(
    state: &AppState,
    delivery_id: Uuid,
    deliverer_id: Uuid,
    location: Option<GeoPoint>,
) -> Result<Delivery, AppError> {
    let now = Utc::now();
    let (updated, event) = {
        let mut delivery = state
            .store
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| not_eligible(delivery_id))?;

        if delivery.deliverer_id != deliverer_id || delivery.status != DeliveryStatus::PickedUp {
            return Err(not_eligible(delivery_id));
        }

        delivery.status = DeliveryStatus::InTransit;
        delivery.in_transit_at = Some(now);

        let event = tracking_event(&delivery, "Livraison en cours", location, now);
        state.store.append_tracking(event.clone());
        (delivery.clone(), event)
    };

    publish(state, event);
    tracing::info!(delivery_id = %delivery_id, "delivery in transit");
    Ok(updated)
}

/// Completion is gated on the confirmation code the client holds. The
/// DELIVERED transition and the wallet credit land in one guarded unit; the
/// status precondition doubles as the exactly-once guard for the credit.
pub fn complete(
    state: &AppState,
    delivery_id: Uuid,
    deliverer_id: Uuid,
    confirmation_code: &str,
    location: Option<GeoPoint>,
) -> Result<Delivery, AppError> {
    let now = Utc::now();
    let (updated, event) = {
        let mut delivery = state
            .store
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| not_eligible(delivery_id))?;

        if delivery.deliverer_id != deliverer_id || delivery.status != DeliveryStatus::InTransit {
            return Err(not_eligible(delivery_id));
        }

        if delivery.confirmation_code != confirmation_code {
            return Err(AppError::BadRequest(
                "invalid confirmation code".to_string(),
            ));
        }

        delivery.status = DeliveryStatus::Delivered;
        delivery.delivered_at = Some(now);

        let event = tracking_event(&delivery, "Colis livré", location, now);
        state.store.append_tracking(event.clone());

        ledger::credit_earning(
            &state.store,
            delivery.deliverer_id,
            delivery.fee,
            delivery.id,
            now,
        );

        (delivery.clone(), event)
    };

    publish(state, event);
    tracing::info!(delivery_id = %delivery_id, fee = %updated.fee, "delivery completed, earning credited");
    Ok(updated)
}

/// Client-initiated cancellation, only before pickup. The announcement is
/// retired along with the delivery.
pub fn cancel(state: &AppState, delivery_id: Uuid, client_id: Uuid) -> Result<Delivery, AppError> {
    let now = Utc::now();
    let (updated, event) = {
        let mut delivery = state
            .store
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| not_eligible(delivery_id))?;

        if delivery.client_id != client_id {
            return Err(not_eligible(delivery_id));
        }

        if delivery.status != DeliveryStatus::Accepted {
            return Err(AppError::Conflict(format!(
                "delivery {delivery_id} can no longer be cancelled"
            )));
        }

        delivery.status = DeliveryStatus::Cancelled;
        delivery.cancelled_at = Some(now);

        if let Some(mut announcement) = state.store.announcements.get_mut(&delivery.announcement_id)
        {
            announcement.status = AnnouncementStatus::Cancelled;
        }

        let event = tracking_event(&delivery, "Livraison annulée", None, now);
        state.store.append_tracking(event.clone());
        (delivery.clone(), event)
    };

    publish(state, event);
    tracing::info!(delivery_id = %delivery_id, "delivery cancelled");
    Ok(updated)
}

fn tracking_event(
    delivery: &Delivery,
    message: &str,
    location: Option<GeoPoint>,
    at: DateTime<Utc>,
) -> TrackingEvent {
    TrackingEvent {
        id: Uuid::new_v4(),
        delivery_id: delivery.id,
        status: delivery.status,
        message: message.to_string(),
        location,
        recorded_at: at,
    }
}

fn publish(state: &AppState, event: TrackingEvent) {
    state
        .metrics
        .delivery_transitions_total
        .with_label_values(&[event.status.as_str()])
        .inc();
    let _ = state.tracking_events_tx.send(event);
}

/// Human-facing parcel code, `ECO-` plus six unambiguous characters.
pub fn generate_tracking_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("ECO-{suffix}")
}

/// Six-digit code disclosed to the client and required at completion.
pub fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::*;
    use crate::config::Config;
    use crate::models::wallet::{OperationKind, OperationStatus};
    use crate::payments::gateway::MockGateway;
    use crate::store::Store;

    fn test_state() -> AppState {
        let config = Config {
            http_port: 0,
            log_level: "info".to_string(),
            match_queue_size: 16,
            event_buffer_size: 16,
            admin_token: "test-admin".to_string(),
            min_withdrawal: Decimal::from(10),
            gateway_auto_confirm: true,
            currency: "EUR".to_string(),
        };
        let (state, _rx) = AppState::new(&config, Store::new(), Arc::new(MockGateway::new(true)));
        state
    }

    fn seed_delivery(state: &AppState, status: DeliveryStatus) -> Delivery {
        let delivery = Delivery {
            id: Uuid::new_v4(),
            announcement_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            deliverer_id: Uuid::new_v4(),
            status,
            tracking_code: "ECO-TEST01".to_string(),
            confirmation_code: "123456".to_string(),
            fee: Decimal::from(25),
            pickup_address: "12 rue de Rivoli, Paris".to_string(),
            delivery_address: "3 place Bellecour, Lyon".to_string(),
            accepted_at: Utc::now(),
            picked_up_at: None,
            in_transit_at: None,
            delivered_at: None,
            cancelled_at: None,
        };
        state.store.deliveries.insert(delivery.id, delivery.clone());
        delivery
    }

    #[test]
    fn pickup_from_accepted_appends_one_tracking_row() {
        let state = test_state();
        let delivery = seed_delivery(&state, DeliveryStatus::Accepted);

        let updated = pickup(&state, delivery.id, delivery.deliverer_id, None).unwrap();

        assert_eq!(updated.status, DeliveryStatus::PickedUp);
        assert!(updated.picked_up_at.is_some());

        let trail = state.store.tracking_for(delivery.id);
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].status, DeliveryStatus::PickedUp);
        assert_eq!(trail[0].message, "Colis récupéré");
    }

    #[test]
    fn pickup_from_wrong_status_fails_without_mutation() {
        let state = test_state();
        let delivery = seed_delivery(&state, DeliveryStatus::InTransit);

        let err = pickup(&state, delivery.id, delivery.deliverer_id, None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let stored = state.store.deliveries.get(&delivery.id).unwrap();
        assert_eq!(stored.status, DeliveryStatus::InTransit);
        assert!(state.store.tracking_for(delivery.id).is_empty());
    }

    #[test]
    fn pickup_by_wrong_deliverer_is_conflated_with_not_found() {
        let state = test_state();
        let delivery = seed_delivery(&state, DeliveryStatus::Accepted);

        let err = pickup(&state, delivery.id, Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let stored = state.store.deliveries.get(&delivery.id).unwrap();
        assert_eq!(stored.status, DeliveryStatus::Accepted);
    }

    #[test]
    fn start_requires_picked_up() {
        let state = test_state();
        let delivery = seed_delivery(&state, DeliveryStatus::Accepted);

        assert!(start(&state, delivery.id, delivery.deliverer_id, None).is_err());

        pickup(&state, delivery.id, delivery.deliverer_id, None).unwrap();
        let updated = start(&state, delivery.id, delivery.deliverer_id, None).unwrap();
        assert_eq!(updated.status, DeliveryStatus::InTransit);
        assert_eq!(state.store.tracking_for(delivery.id).len(), 2);
    }

    #[test]
    fn complete_credits_the_wallet_exactly_once() {
        let state = test_state();
        let delivery = seed_delivery(&state, DeliveryStatus::InTransit);

        let updated = complete(&state, delivery.id, delivery.deliverer_id, "123456", None).unwrap();
        assert_eq!(updated.status, DeliveryStatus::Delivered);

        let wallet = state.store.wallets.get(&delivery.deliverer_id).unwrap();
        assert_eq!(wallet.balance, Decimal::from(25));
        assert_eq!(wallet.total_deposits, Decimal::from(25));

        let ops = state.store.operations_for(delivery.deliverer_id);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OperationKind::Earning);
        assert_eq!(ops[0].status, OperationStatus::Completed);

        // Terminal state: a retry must not double-credit.
        let err = complete(&state, delivery.id, delivery.deliverer_id, "123456", None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let wallet = state.store.wallets.get(&delivery.deliverer_id).unwrap();
        assert_eq!(wallet.balance, Decimal::from(25));
        assert_eq!(state.store.operations_for(delivery.deliverer_id).len(), 1);
    }

    #[test]
    fn complete_with_wrong_code_credits_nothing() {
        let state = test_state();
        let delivery = seed_delivery(&state, DeliveryStatus::InTransit);

        let err = complete(&state, delivery.id, delivery.deliverer_id, "000000", None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let stored = state.store.deliveries.get(&delivery.id).unwrap();
        assert_eq!(stored.status, DeliveryStatus::InTransit);
        assert!(state.store.wallets.get(&delivery.deliverer_id).is_none());
    }

    #[test]
    fn cancel_only_from_accepted() {
        let state = test_state();
        let delivery = seed_delivery(&state, DeliveryStatus::PickedUp);

        let err = cancel(&state, delivery.id, delivery.client_id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let accepted = seed_delivery(&state, DeliveryStatus::Accepted);
        let updated = cancel(&state, accepted.id, accepted.client_id).unwrap();
        assert_eq!(updated.status, DeliveryStatus::Cancelled);
        assert!(updated.cancelled_at.is_some());
    }

    #[test]
    fn generated_codes_have_expected_shape() {
        let tracking = generate_tracking_code();
        assert!(tracking.starts_with("ECO-"));
        assert_eq!(tracking.len(), 10);

        let confirmation = generate_confirmation_code();
        assert_eq!(confirmation.len(), 6);
        assert!(confirmation.chars().all(|c| c.is_ascii_digit()));
    }
}
