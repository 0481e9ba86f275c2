use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageBox {
    pub id: Uuid,
    pub code: String,
    pub monthly_price: Decimal,
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Pending,
    Active,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// A storage-box rental. The box is only reserved once the gateway confirms
/// payment, never at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxRental {
    pub id: Uuid,
    pub box_id: Uuid,
    pub client_id: Uuid,
    pub status: RentalStatus,
    pub payment_intent_id: String,
    pub payment_status: PaymentStatus,
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
