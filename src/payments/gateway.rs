use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Unavailable(String),

    #[error("unknown payment intent: {0}")]
    UnknownIntent(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => AppError::GatewayUnavailable(msg),
            GatewayError::UnknownIntent(id) => {
                AppError::Internal(format!("payment intent {id} unknown to gateway"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: IntentStatus,
}

/// Seam to the external payment provider. The provider's view is
/// authoritative: local payment state only advances after `retrieve_intent`
/// reports the money has actually moved.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        reference: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}

/// In-process stand-in for the real provider. With `auto_confirm` set,
/// retrieval reports intents as succeeded, playing the part of a client that
/// completed the payment form; tests flip individual intents with `settle`.
pub struct MockGateway {
    intents: DashMap<String, PaymentIntent>,
    auto_confirm: bool,
}

impl MockGateway {
    pub fn new(auto_confirm: bool) -> Self {
        Self {
            intents: DashMap::new(),
            auto_confirm,
        }
    }

    pub fn settle(&self, intent_id: &str, status: IntentStatus) {
        if let Some(mut intent) = self.intents.get_mut(intent_id) {
            intent.status = status;
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        _reference: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let intent = PaymentIntent {
            id: format!("pi_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
            status: IntentStatus::Pending,
        };
        self.intents.insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let mut intent = self
            .intents
            .get(intent_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| GatewayError::UnknownIntent(intent_id.to_string()))?;

        if self.auto_confirm && intent.status == IntentStatus::Pending {
            intent.status = IntentStatus::Succeeded;
            self.intents.insert(intent.id.clone(), intent.clone());
        }

        Ok(intent)
    }
}
