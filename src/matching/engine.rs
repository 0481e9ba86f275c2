use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle;
use crate::matching::MAX_LIVE_DELIVERIES;
use crate::matching::queue::enqueue_announcement;
use crate::matching::scoring::compute_score;
use crate::models::announcement::{Announcement, AnnouncementStatus};
use crate::models::delivery::{Delivery, DeliveryStatus, TrackingEvent};
use crate::models::user::{GeoPoint, UserAccount, UserRole, ValidationStatus};
use crate::state::AppState;

pub async fn run_matching_engine(
    state: Arc<AppState>,
    mut announcement_rx: mpsc::Receiver<Announcement>,
) {
    info!("matching engine started");

    while let Some(announcement) = announcement_rx.recv().await {
        state.metrics.announcements_in_queue.dec();

        let start = Instant::now();
        match process_announcement(state.clone(), announcement).await {
            Ok(()) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .match_latency_seconds
                    .with_label_values(&["success"])
                    .observe(elapsed);
                state
                    .metrics
                    .matches_total
                    .with_label_values(&["success"])
                    .inc();
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .match_latency_seconds
                    .with_label_values(&["error"])
                    .observe(elapsed);
                state
                    .metrics
                    .matches_total
                    .with_label_values(&["error"])
                    .inc();
                error!(error = %err, "failed to match announcement");
            }
        }
    }

    warn!("matching engine stopped: queue channel closed");
}

async fn process_announcement(
    state: Arc<AppState>,
    announcement: Announcement,
) -> Result<(), AppError> {
    // The announcement may have been cancelled while it sat in the queue.
    let still_published = state
        .store
        .announcements
        .get(&announcement.id)
        .map(|entry| entry.status == AnnouncementStatus::Published)
        .unwrap_or(false);
    if !still_published {
        info!(announcement_id = %announcement.id, "announcement no longer published; skipping");
        return Ok(());
    }

    let candidates: Vec<(UserAccount, GeoPoint, usize)> = state
        .store
        .users
        .iter()
        .filter_map(|entry| {
            let user = entry.value();
            if user.role != UserRole::Deliverer
                || user.validation_status != ValidationStatus::Approved
                || !user.is_active
            {
                return None;
            }
            let location = user.location?;
            let live_load = state.store.live_delivery_count(user.id);
            if live_load >= MAX_LIVE_DELIVERIES {
                return None;
            }
            Some((user.clone(), location, live_load))
        })
        .collect();

    if candidates.is_empty() {
        warn!(announcement_id = %announcement.id, "no eligible deliverers; re-queueing");
        sleep(Duration::from_millis(250)).await;
        enqueue_announcement(&state, announcement).await?;
        return Ok(());
    }

    let (winner, best_score, _breakdown) = candidates
        .iter()
        .map(|(user, location, live_load)| {
            let (score, breakdown) = compute_score(user, location, *live_load, &announcement);
            (user, score, breakdown)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| AppError::Internal("failed to score deliverers".to_string()))?;

    let now = Utc::now();
    let delivery = {
        let mut stored = state
            .store
            .announcements
            .get_mut(&announcement.id)
            .ok_or_else(|| {
                AppError::Internal(format!("announcement {} disappeared", announcement.id))
            })?;

        // Conditional write: only the first matcher of a still-published
        // announcement creates a delivery.
        if stored.status != AnnouncementStatus::Published {
            return Ok(());
        }
        stored.status = AnnouncementStatus::Matched;

        let delivery = Delivery {
            id: Uuid::new_v4(),
            announcement_id: announcement.id,
            client_id: stored.client_id,
            deliverer_id: winner.id,
            status: DeliveryStatus::Accepted,
            tracking_code: lifecycle::generate_tracking_code(),
            confirmation_code: lifecycle::generate_confirmation_code(),
            fee: stored.fee,
            pickup_address: stored.pickup_address.clone(),
            delivery_address: stored.delivery_address.clone(),
            accepted_at: now,
            picked_up_at: None,
            in_transit_at: None,
            delivered_at: None,
            cancelled_at: None,
        };
        state.store.deliveries.insert(delivery.id, delivery.clone());

        let event = TrackingEvent {
            id: Uuid::new_v4(),
            delivery_id: delivery.id,
            status: DeliveryStatus::Accepted,
            message: "Livraison acceptée".to_string(),
            location: None,
            recorded_at: now,
        };
        state.store.append_tracking(event.clone());
        let _ = state.tracking_events_tx.send(event);

        delivery
    };

    state
        .metrics
        .delivery_transitions_total
        .with_label_values(&[DeliveryStatus::Accepted.as_str()])
        .inc();

    info!(
        announcement_id = %announcement.id,
        delivery_id = %delivery.id,
        deliverer_id = %winner.id,
        score = best_score,
        "announcement matched"
    );

    Ok(())
}
