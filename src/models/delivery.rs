use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    /// Once reached, no further transition is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Statuses counting towards a deliverer's live workload.
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    /// Wire/metric label, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Accepted => "ACCEPTED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub announcement_id: Uuid,
    pub client_id: Uuid,
    pub deliverer_id: Uuid,
    pub status: DeliveryStatus,
    /// Human-facing code printed on the parcel.
    pub tracking_code: String,
    /// Disclosed only to the owning client; the deliverer must present it to
    /// complete the delivery.
    #[serde(skip_serializing)]
    pub confirmation_code: String,
    pub fee: Decimal,
    pub pickup_address: String,
    pub delivery_address: String,
    pub accepted_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub in_transit_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Append-only audit row, one per status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub status: DeliveryStatus,
    pub message: String,
    pub location: Option<GeoPoint>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRating {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub rated_by: Uuid,
    pub target_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::DeliveryStatus;

    #[test]
    fn terminal_statuses() {
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Cancelled.is_terminal());
        assert!(!DeliveryStatus::Accepted.is_terminal());
        assert!(!DeliveryStatus::PickedUp.is_terminal());
        assert!(!DeliveryStatus::InTransit.is_terminal());
    }
}
