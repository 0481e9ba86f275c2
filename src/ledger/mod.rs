//! Wallet ledger.
//!
//! Earnings are credited as COMPLETED operations from the delivery state
//! machine; withdrawals go through a PENDING operation that only touches the
//! balance once an admin decides it. Balance, total_deposits and
//! total_withdrawals change nowhere else, so `balance == total_deposits -
//! total_withdrawals` holds by construction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::wallet::{OperationKind, OperationStatus, Wallet, WalletOperation};
use crate::state::AppState;
use crate::store::Store;

/// Credits a completed delivery's fee. Called from `lifecycle::complete`
/// while the delivery row guard is held, which makes the DELIVERED
/// transition and this credit a single unit.
pub fn credit_earning(
    store: &Store,
    user_id: Uuid,
    amount: Decimal,
    delivery_id: Uuid,
    at: DateTime<Utc>,
) {
    let mut wallet = store
        .wallets
        .entry(user_id)
        .or_insert_with(|| Wallet::new(user_id));
    wallet.balance += amount;
    wallet.total_deposits += amount;
    wallet.updated_at = at;

    let operation = WalletOperation {
        id: Uuid::new_v4(),
        user_id,
        kind: OperationKind::Earning,
        amount,
        status: OperationStatus::Completed,
        reference: Some(delivery_id.to_string()),
        notes: None,
        requested_at: at,
        processed_at: Some(at),
        processed_by: None,
    };
    store.operations.insert(operation.id, operation);
}

/// Creates a PENDING withdrawal. The balance is untouched here; only an
/// admin decision moves money.
pub fn request_withdrawal(
    state: &AppState,
    user_id: Uuid,
    amount: Decimal,
) -> Result<WalletOperation, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "amount must be greater than zero".to_string(),
        ));
    }

    if amount < state.min_withdrawal {
        return Err(AppError::BadRequest(format!(
            "minimum withdrawal amount is {}",
            state.min_withdrawal
        )));
    }

    let balance = state
        .store
        .wallets
        .get(&user_id)
        .map(|wallet| wallet.balance)
        .unwrap_or(Decimal::ZERO);

    let available = balance - state.store.pending_withdrawal_total(user_id);
    if available < amount {
        return Err(AppError::BadRequest(
            "insufficient available balance".to_string(),
        ));
    }

    if state.store.has_pending_withdrawal(user_id) {
        return Err(AppError::Conflict(
            "a withdrawal request is already pending".to_string(),
        ));
    }

    let operation = WalletOperation {
        id: Uuid::new_v4(),
        user_id,
        kind: OperationKind::Withdrawal,
        amount,
        status: OperationStatus::Pending,
        reference: None,
        notes: None,
        requested_at: Utc::now(),
        processed_at: None,
        processed_by: None,
    };
    state.store.operations.insert(operation.id, operation.clone());

    tracing::info!(user_id = %user_id, amount = %amount, "withdrawal requested");
    Ok(operation)
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalDecision {
    Completed,
    Failed,
}

impl WithdrawalDecision {
    fn as_str(&self) -> &'static str {
        match self {
            WithdrawalDecision::Completed => "COMPLETED",
            WithdrawalDecision::Failed => "FAILED",
        }
    }
}

/// Admin decision over a PENDING withdrawal. COMPLETED debits the wallet,
/// FAILED leaves it untouched; either way the operation is terminal and is
/// never revisited.
pub fn process_withdrawal(
    state: &AppState,
    operation_id: Uuid,
    decision: WithdrawalDecision,
    admin_id: Uuid,
    notes: Option<String>,
) -> Result<WalletOperation, AppError> {
    let now = Utc::now();

    let mut operation = state
        .store
        .operations
        .get_mut(&operation_id)
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {operation_id} not found")))?;

    if operation.kind != OperationKind::Withdrawal {
        return Err(AppError::BadRequest(format!(
            "operation {operation_id} is not a withdrawal"
        )));
    }

    if operation.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "withdrawal {operation_id} has already been processed"
        )));
    }

    match decision {
        WithdrawalDecision::Completed => {
            let mut wallet = state
                .store
                .wallets
                .get_mut(&operation.user_id)
                .ok_or_else(|| {
                    AppError::Internal(format!("wallet missing for user {}", operation.user_id))
                })?;

            if wallet.balance < operation.amount {
                return Err(AppError::Conflict(
                    "wallet balance no longer covers this withdrawal".to_string(),
                ));
            }

            wallet.balance -= operation.amount;
            wallet.total_withdrawals += operation.amount;
            wallet.updated_at = now;
            operation.status = OperationStatus::Completed;
        }
        WithdrawalDecision::Failed => {
            let has_notes = notes
                .as_deref()
                .map(|n| !n.trim().is_empty())
                .unwrap_or(false);
            if !has_notes {
                return Err(AppError::BadRequest(
                    "notes are required when failing a withdrawal".to_string(),
                ));
            }
            operation.status = OperationStatus::Failed;
        }
    }

    operation.processed_at = Some(now);
    operation.processed_by = Some(admin_id);
    operation.notes = notes;

    state
        .metrics
        .withdrawals_processed_total
        .with_label_values(&[decision.as_str()])
        .inc();

    tracing::info!(
        operation_id = %operation_id,
        decision = decision.as_str(),
        "withdrawal processed"
    );
    Ok(operation.clone())
}

#[derive(Debug, Serialize)]
pub struct WalletSummary {
    pub balance: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub pending_withdrawals: Decimal,
    pub operations: Vec<WalletOperation>,
}

pub fn wallet_summary(store: &Store, user_id: Uuid) -> WalletSummary {
    let wallet = store
        .wallets
        .get(&user_id)
        .map(|entry| entry.clone())
        .unwrap_or_else(|| Wallet::new(user_id));

    WalletSummary {
        balance: wallet.balance,
        total_deposits: wallet.total_deposits,
        total_withdrawals: wallet.total_withdrawals,
        pending_withdrawals: store.pending_withdrawal_total(user_id),
        operations: store.operations_for(user_id),
    }
}

pub fn list_withdrawals(store: &Store, status: Option<OperationStatus>) -> Vec<WalletOperation> {
    let mut withdrawals: Vec<WalletOperation> = store
        .operations
        .iter()
        .filter(|entry| {
            entry.kind == OperationKind::Withdrawal
                && status.map(|wanted| entry.status == wanted).unwrap_or(true)
        })
        .map(|entry| entry.clone())
        .collect();
    withdrawals.sort_by_key(|op| op.requested_at);
    withdrawals
}
