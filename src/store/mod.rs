use std::collections::HashMap;

use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::announcement::Announcement;
use crate::models::delivery::{Delivery, DeliveryRating, TrackingEvent};
use crate::models::document::{Document, DocumentType};
use crate::models::storage::{BoxRental, StorageBox};
use crate::models::user::UserAccount;
use crate::models::wallet::{OperationKind, OperationStatus, Wallet, WalletOperation};

/// Keyed entity maps standing in for the relational tables. Constructed
/// explicitly and passed in through `AppState` so tests can substitute their
/// own instance per call. Status-bearing rows are only ever mutated through
/// the guarded functions in `lifecycle`, `ledger`, `payments` and
/// `verification`, never by direct field writes from handlers.
#[derive(Default)]
pub struct Store {
    pub users: DashMap<Uuid, UserAccount>,
    /// Bearer token -> user id.
    pub sessions: DashMap<String, Uuid>,
    pub announcements: DashMap<Uuid, Announcement>,
    pub deliveries: DashMap<Uuid, Delivery>,
    /// Append-only tracking rows, keyed by delivery id.
    pub tracking: DashMap<Uuid, Vec<TrackingEvent>>,
    /// Keyed by owning user id.
    pub wallets: DashMap<Uuid, Wallet>,
    pub operations: DashMap<Uuid, WalletOperation>,
    pub documents: DashMap<Uuid, Document>,
    pub boxes: DashMap<Uuid, StorageBox>,
    pub rentals: DashMap<Uuid, BoxRental>,
    pub ratings: DashMap<Uuid, DeliveryRating>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_for_token(&self, token: &str) -> Option<UserAccount> {
        let user_id = *self.sessions.get(token)?;
        self.users.get(&user_id).map(|entry| entry.clone())
    }

    pub fn append_tracking(&self, event: TrackingEvent) {
        self.tracking
            .entry(event.delivery_id)
            .or_default()
            .push(event);
    }

    pub fn tracking_for(&self, delivery_id: Uuid) -> Vec<TrackingEvent> {
        self.tracking
            .get(&delivery_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Deliveries currently on a deliverer's hands (not DELIVERED/CANCELLED).
    pub fn live_delivery_count(&self, deliverer_id: Uuid) -> usize {
        self.deliveries
            .iter()
            .filter(|entry| {
                entry.deliverer_id == deliverer_id && entry.status.is_live()
            })
            .count()
    }

    pub fn deliveries_for_deliverer(&self, deliverer_id: Uuid) -> Vec<Delivery> {
        let mut deliveries: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|entry| entry.deliverer_id == deliverer_id)
            .map(|entry| entry.clone())
            .collect();
        deliveries.sort_by_key(|d| d.accepted_at);
        deliveries
    }

    /// The most recently submitted document of each type for a user.
    /// Resubmission supersedes the earlier row of the same type.
    pub fn latest_documents(&self, user_id: Uuid) -> HashMap<DocumentType, Document> {
        let mut latest: HashMap<DocumentType, Document> = HashMap::new();
        for entry in self.documents.iter() {
            if entry.user_id != user_id {
                continue;
            }
            match latest.get(&entry.doc_type) {
                Some(existing) if existing.submitted_at >= entry.submitted_at => {}
                _ => {
                    latest.insert(entry.doc_type, entry.clone());
                }
            }
        }
        latest
    }

    pub fn operations_for(&self, user_id: Uuid) -> Vec<WalletOperation> {
        let mut operations: Vec<WalletOperation> = self
            .operations
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        operations.sort_by_key(|op| op.requested_at);
        operations
    }

    /// Sum of withdrawal requests awaiting an admin decision. Counted against
    /// the available balance so a second request cannot overdraw the wallet.
    pub fn pending_withdrawal_total(&self, user_id: Uuid) -> Decimal {
        self.operations
            .iter()
            .filter(|entry| {
                entry.user_id == user_id
                    && entry.kind == OperationKind::Withdrawal
                    && entry.status == OperationStatus::Pending
            })
            .map(|entry| entry.amount)
            .sum()
    }

    pub fn has_pending_withdrawal(&self, user_id: Uuid) -> bool {
        self.operations.iter().any(|entry| {
            entry.user_id == user_id
                && entry.kind == OperationKind::Withdrawal
                && entry.status == OperationStatus::Pending
        })
    }

    pub fn rating_exists(&self, delivery_id: Uuid, rated_by: Uuid) -> bool {
        self.ratings
            .iter()
            .any(|entry| entry.delivery_id == delivery_id && entry.rated_by == rated_by)
    }
}
