use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Identity,
    DrivingLicence,
    Insurance,
    Certification,
}

impl DocumentType {
    /// Document types an account must have individually approved before its
    /// aggregate validation status may become APPROVED.
    pub fn required_for(role: UserRole) -> &'static [DocumentType] {
        match role {
            UserRole::Deliverer => &[
                DocumentType::Identity,
                DocumentType::DrivingLicence,
                DocumentType::Insurance,
            ],
            UserRole::Provider => &[DocumentType::Identity, DocumentType::Certification],
            UserRole::Client | UserRole::Admin => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}
