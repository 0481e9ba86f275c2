use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Client,
    Deliverer,
    Provider,
    Admin,
}

impl UserRole {
    /// Roles whose ability to operate is gated behind document review.
    pub fn requires_validation(&self) -> bool {
        matches!(self, UserRole::Deliverer | UserRole::Provider)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub validation_status: ValidationStatus,
    pub is_active: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub rating: f64,
    pub rating_count: u32,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(name: String, role: UserRole) -> Self {
        let gated = role.requires_validation();
        Self {
            id: Uuid::new_v4(),
            name,
            role,
            validation_status: if gated {
                ValidationStatus::Pending
            } else {
                ValidationStatus::Approved
            },
            is_active: !gated,
            verified_at: None,
            location: None,
            rating: 0.0,
            rating_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Average rating, or a neutral default while unrated.
    pub fn effective_rating(&self) -> f64 {
        if self.rating_count == 0 {
            4.0
        } else {
            self.rating
        }
    }

    pub fn record_rating(&mut self, value: u8) {
        let total = self.rating * self.rating_count as f64 + value as f64;
        self.rating_count += 1;
        self.rating = total / self.rating_count as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliverer_starts_pending_and_inactive() {
        let user = UserAccount::new("Marc".to_string(), UserRole::Deliverer);
        assert_eq!(user.validation_status, ValidationStatus::Pending);
        assert!(!user.is_active);
    }

    #[test]
    fn client_starts_approved_and_active() {
        let user = UserAccount::new("Camille".to_string(), UserRole::Client);
        assert_eq!(user.validation_status, ValidationStatus::Approved);
        assert!(user.is_active);
    }

    #[test]
    fn rating_average_accumulates() {
        let mut user = UserAccount::new("Marc".to_string(), UserRole::Deliverer);
        assert_eq!(user.effective_rating(), 4.0);

        user.record_rating(5);
        user.record_rating(3);
        assert!((user.effective_rating() - 4.0).abs() < 1e-9);
        assert_eq!(user.rating_count, 2);
    }
}
