//! Verification/validation status tracker.
//!
//! Documents move PENDING -> {APPROVED, REJECTED}; both are terminal for the
//! row itself, and a rejected user re-enters PENDING only by submitting a
//! new document (a fresh row superseding the old one, not a reopened
//! record). A user's aggregate status is recomputed from the latest document
//! of each required type; it becomes APPROVED only when every one of them is
//! individually approved.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::document::{Document, DocumentStatus, DocumentType};
use crate::models::user::{UserAccount, ValidationStatus};
use crate::state::AppState;
use crate::store::Store;

pub fn submit_document(
    state: &AppState,
    user: &UserAccount,
    doc_type: DocumentType,
) -> Result<Document, AppError> {
    if !user.role.requires_validation() {
        return Err(AppError::Forbidden(
            "only deliverers and providers submit verification documents".to_string(),
        ));
    }

    let document = Document {
        id: Uuid::new_v4(),
        user_id: user.id,
        doc_type,
        status: DocumentStatus::Pending,
        rejection_reason: None,
        submitted_at: Utc::now(),
        reviewed_at: None,
        reviewed_by: None,
    };
    state.store.documents.insert(document.id, document.clone());

    recompute_validation(&state.store, user.id);

    tracing::info!(user_id = %user.id, doc_type = ?doc_type, "document submitted");
    Ok(document)
}

/// Approving an already-APPROVED document is an idempotent no-op: the stored
/// row is returned as-is, review stamps included, with nothing re-stamped.
pub fn approve_document(
    state: &AppState,
    document_id: Uuid,
    admin_id: Uuid,
) -> Result<Document, AppError> {
    let (document, changed) = {
        let mut document = state
            .store
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| AppError::NotFound(format!("document {document_id} not found")))?;

        match document.status {
            DocumentStatus::Approved => (document.clone(), false),
            DocumentStatus::Rejected => {
                return Err(AppError::Conflict(
                    "document was rejected; a new submission is required".to_string(),
                ));
            }
            DocumentStatus::Pending => {
                document.status = DocumentStatus::Approved;
                document.reviewed_at = Some(Utc::now());
                document.reviewed_by = Some(admin_id);
                (document.clone(), true)
            }
        }
    };

    if changed {
        recompute_validation(&state.store, document.user_id);
        state
            .metrics
            .documents_reviewed_total
            .with_label_values(&["APPROVED"])
            .inc();
        tracing::info!(document_id = %document_id, "document approved");
    }

    Ok(document)
}

pub fn reject_document(
    state: &AppState,
    document_id: Uuid,
    admin_id: Uuid,
    reason: &str,
) -> Result<Document, AppError> {
    if reason.trim().is_empty() {
        return Err(AppError::BadRequest(
            "a rejection reason is required".to_string(),
        ));
    }

    let document = {
        let mut document = state
            .store
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| AppError::NotFound(format!("document {document_id} not found")))?;

        if document.status != DocumentStatus::Pending {
            return Err(AppError::Conflict(format!(
                "document {document_id} has already been reviewed"
            )));
        }

        document.status = DocumentStatus::Rejected;
        document.rejection_reason = Some(reason.to_string());
        document.reviewed_at = Some(Utc::now());
        document.reviewed_by = Some(admin_id);
        document.clone()
    };

    recompute_validation(&state.store, document.user_id);
    state
        .metrics
        .documents_reviewed_total
        .with_label_values(&["REJECTED"])
        .inc();

    tracing::info!(document_id = %document_id, reason = %reason, "document rejected");
    Ok(document)
}

/// Re-derives a user's aggregate validation status from the latest document
/// of each required type. `verified_at` is stamped once, on the transition
/// into APPROVED, and kept as history afterwards.
fn recompute_validation(store: &Store, user_id: Uuid) {
    let latest = store.latest_documents(user_id);

    let Some(mut user) = store.users.get_mut(&user_id) else {
        return;
    };
    if !user.role.requires_validation() {
        return;
    }

    let required = DocumentType::required_for(user.role);
    let all_approved = required.iter().all(|doc_type| {
        matches!(latest.get(doc_type), Some(doc) if doc.status == DocumentStatus::Approved)
    });

    if all_approved {
        if user.validation_status != ValidationStatus::Approved {
            user.validation_status = ValidationStatus::Approved;
            user.is_active = true;
            user.verified_at = Some(Utc::now());
        }
    } else {
        let any_rejected = required.iter().any(|doc_type| {
            matches!(latest.get(doc_type), Some(doc) if doc.status == DocumentStatus::Rejected)
        });
        user.validation_status = if any_rejected {
            ValidationStatus::Rejected
        } else {
            ValidationStatus::Pending
        };
        user.is_active = false;
    }
}

#[derive(Debug, Serialize)]
pub struct VerificationStats {
    pub pending_documents: usize,
    pub approved_documents: usize,
    pub rejected_documents: usize,
    pub pending_users: usize,
    pub approved_users: usize,
    pub rejected_users: usize,
}

pub fn verification_stats(store: &Store) -> VerificationStats {
    let mut stats = VerificationStats {
        pending_documents: 0,
        approved_documents: 0,
        rejected_documents: 0,
        pending_users: 0,
        approved_users: 0,
        rejected_users: 0,
    };

    for entry in store.documents.iter() {
        match entry.status {
            DocumentStatus::Pending => stats.pending_documents += 1,
            DocumentStatus::Approved => stats.approved_documents += 1,
            DocumentStatus::Rejected => stats.rejected_documents += 1,
        }
    }

    for entry in store.users.iter() {
        if !entry.role.requires_validation() {
            continue;
        }
        match entry.validation_status {
            ValidationStatus::Pending => stats.pending_users += 1,
            ValidationStatus::Approved => stats.approved_users += 1,
            ValidationStatus::Rejected => stats.rejected_users += 1,
        }
    }

    stats
}
