pub mod gateway;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::storage::{BoxRental, PaymentStatus, RentalStatus};
use crate::state::AppState;

use gateway::IntentStatus;

/// Creates a PENDING rental backed by a freshly created payment intent. The
/// box stays available until the payment is confirmed; reservation happens
/// in `confirm_rental_payment`, never here.
pub async fn rent_box(
    state: &AppState,
    client_id: Uuid,
    box_id: Uuid,
) -> Result<BoxRental, AppError> {
    let amount = {
        let storage_box = state
            .store
            .boxes
            .get(&box_id)
            .ok_or_else(|| AppError::NotFound(format!("storage box {box_id} not found")))?;

        if !storage_box.is_available {
            return Err(AppError::Conflict(format!(
                "storage box {box_id} is not available"
            )));
        }

        storage_box.monthly_price
    };

    let intent = state
        .gateway
        .create_intent(amount, &state.currency, &format!("box-rental-{box_id}"))
        .await?;

    let rental = BoxRental {
        id: Uuid::new_v4(),
        box_id,
        client_id,
        status: RentalStatus::Pending,
        payment_intent_id: intent.id,
        payment_status: PaymentStatus::Pending,
        amount,
        paid_at: None,
        created_at: Utc::now(),
    };

    state.store.rentals.insert(rental.id, rental.clone());

    tracing::info!(rental_id = %rental.id, box_id = %box_id, "rental created, awaiting payment");
    Ok(rental)
}

/// The escrow gate. Queries the gateway's authoritative intent status and, on
/// success, applies the three-way write (rental ACTIVE, payment COMPLETED
/// with a paid timestamp, box unavailable) as one unit: every precondition
/// is re-checked under the row guards before the first field is touched.
pub async fn confirm_rental_payment(
    state: &AppState,
    client_id: Uuid,
    rental_id: Uuid,
) -> Result<BoxRental, AppError> {
    let (intent_id, box_id) = {
        let rental = state
            .store
            .rentals
            .get(&rental_id)
            .ok_or_else(|| AppError::NotFound(format!("rental {rental_id} not found")))?;

        // Ownership conflated with existence: no hint the rental exists.
        if rental.client_id != client_id {
            return Err(AppError::NotFound(format!("rental {rental_id} not found")));
        }

        // Re-confirming a settled rental is a no-op.
        if rental.payment_status == PaymentStatus::Completed {
            return Ok(rental.clone());
        }

        if rental.status != RentalStatus::Pending {
            return Err(AppError::Conflict(format!(
                "rental {rental_id} is no longer awaiting payment"
            )));
        }

        (rental.payment_intent_id.clone(), rental.box_id)
    };

    // Gateway consulted outside any row guard; on error nothing has moved.
    let intent = state.gateway.retrieve_intent(&intent_id).await?;

    match intent.status {
        IntentStatus::Pending => Err(AppError::Conflict(
            "payment has not been confirmed by the gateway".to_string(),
        )),
        IntentStatus::Failed => {
            if let Some(mut rental) = state.store.rentals.get_mut(&rental_id) {
                rental.payment_status = PaymentStatus::Failed;
                rental.status = RentalStatus::Cancelled;
            }
            Err(AppError::Conflict(
                "payment failed at the gateway".to_string(),
            ))
        }
        IntentStatus::Succeeded => {
            let mut rental = state
                .store
                .rentals
                .get_mut(&rental_id)
                .ok_or_else(|| AppError::NotFound(format!("rental {rental_id} not found")))?;

            // A concurrent confirmation may have won the race while the
            // gateway was being queried.
            if rental.payment_status == PaymentStatus::Completed {
                return Ok(rental.clone());
            }
            if rental.status != RentalStatus::Pending {
                return Err(AppError::Conflict(format!(
                    "rental {rental_id} is no longer awaiting payment"
                )));
            }

            let mut storage_box = state.store.boxes.get_mut(&box_id).ok_or_else(|| {
                AppError::Internal(format!("storage box {box_id} missing for rental {rental_id}"))
            })?;

            if !storage_box.is_available {
                // Another rental claimed the box first; leave everything as
                // it was rather than activate an unbackable rental.
                return Err(AppError::Conflict(format!(
                    "storage box {box_id} is no longer available"
                )));
            }

            storage_box.is_available = false;
            rental.status = RentalStatus::Active;
            rental.payment_status = PaymentStatus::Completed;
            rental.paid_at = Some(Utc::now());

            tracing::info!(rental_id = %rental.id, box_id = %box_id, "rental activated");
            Ok(rental.clone())
        }
    }
}
