use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub const OUTCOME_ACCEPTED: &str = "accepted";
pub const OUTCOME_INVALID: &str = "invalid";
pub const OUTCOME_UNAVAILABLE: &str = "unavailable";

/// Prometheus metrics for the metadata service
pub struct ServerMetrics {
    pub registry: Registry,

    // Submissions by outcome
    pub submissions_total: IntCounterVec,

    pub searches_total: IntCounter,

    // Refreshed on scrape
    pub stored_records: IntGauge,
}

impl ServerMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounterVec::new(
            Opts::new("appmeta_submissions_total", "Metadata submissions by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(submissions_total.clone()))?;

        let searches_total = IntCounter::new("appmeta_searches_total", "Metadata searches served")?;
        registry.register(Box::new(searches_total.clone()))?;

        let stored_records = IntGauge::new("appmeta_stored_records", "Records in the store")?;
        registry.register(Box::new(stored_records.clone()))?;

        Ok(ServerMetrics {
            registry,
            submissions_total,
            searches_total,
            stored_records,
        })
    }

    pub fn record_submission(&self, outcome: &str) {
        self.submissions_total.with_label_values(&[outcome]).inc();
    }

    /// Render every registered metric in the text exposition format
    pub fn gather(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
