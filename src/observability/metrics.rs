use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub matches_total: IntCounterVec,
    pub announcements_in_queue: IntGauge,
    pub match_latency_seconds: HistogramVec,
    pub delivery_transitions_total: IntCounterVec,
    pub withdrawals_processed_total: IntCounterVec,
    pub documents_reviewed_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let matches_total = IntCounterVec::new(
            Opts::new("matches_total", "Total announcement matches by outcome"),
            &["outcome"],
        )
        .expect("valid matches_total metric");

        let announcements_in_queue = IntGauge::new(
            "announcements_in_queue",
            "Current number of announcements awaiting matching",
        )
        .expect("valid announcements_in_queue metric");

        let match_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "match_latency_seconds",
                "Latency of announcement matching in seconds",
            ),
            &["outcome"],
        )
        .expect("valid match_latency_seconds metric");

        let delivery_transitions_total = IntCounterVec::new(
            Opts::new(
                "delivery_transitions_total",
                "Delivery status transitions by resulting status",
            ),
            &["status"],
        )
        .expect("valid delivery_transitions_total metric");

        let withdrawals_processed_total = IntCounterVec::new(
            Opts::new(
                "withdrawals_processed_total",
                "Withdrawal requests processed by admin decision",
            ),
            &["decision"],
        )
        .expect("valid withdrawals_processed_total metric");

        let documents_reviewed_total = IntCounterVec::new(
            Opts::new(
                "documents_reviewed_total",
                "Documents reviewed by admin decision",
            ),
            &["decision"],
        )
        .expect("valid documents_reviewed_total metric");

        registry
            .register(Box::new(matches_total.clone()))
            .expect("register matches_total");
        registry
            .register(Box::new(announcements_in_queue.clone()))
            .expect("register announcements_in_queue");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(delivery_transitions_total.clone()))
            .expect("register delivery_transitions_total");
        registry
            .register(Box::new(withdrawals_processed_total.clone()))
            .expect("register withdrawals_processed_total");
        registry
            .register(Box::new(documents_reviewed_total.clone()))
            .expect("register documents_reviewed_total");

        Self {
            registry,
            matches_total,
            announcements_in_queue,
            match_latency_seconds,
            delivery_transitions_total,
            withdrawals_processed_total,
            documents_reviewed_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
