use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::models::announcement::Announcement;
use crate::models::delivery::TrackingEvent;
use crate::observability::metrics::Metrics;
use crate::payments::gateway::PaymentGateway;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub gateway: Arc<dyn PaymentGateway>,
    pub announcement_tx: mpsc::Sender<Announcement>,
    pub tracking_events_tx: broadcast::Sender<TrackingEvent>,
    pub metrics: Metrics,
    pub min_withdrawal: Decimal,
    pub currency: String,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Store,
        gateway: Arc<dyn PaymentGateway>,
    ) -> (Self, mpsc::Receiver<Announcement>) {
        let (announcement_tx, announcement_rx) = mpsc::channel(config.match_queue_size);
        let (tracking_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                store,
                gateway,
                announcement_tx,
                tracking_events_tx,
                metrics: Metrics::new(),
                min_withdrawal: config.min_withdrawal,
                currency: config.currency.clone(),
            },
            announcement_rx,
        )
    }
}
