//! Metrics and observability utilities
//!
//! Provides metric registration and recording helpers with standardized
//! naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all journalclub metrics
pub const METRICS_PREFIX: &str = "journalclub";

/// Histogram buckets for batch ingest latency (in seconds)
pub const INGEST_BUCKETS: &[f64] = &[
    0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingest metrics
    describe_counter!(
        format!("{}_papers_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total papers inserted or updated from listings"
    );

    describe_counter!(
        format!("{}_papers_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Total duplicate papers skipped during ingest"
    );

    describe_counter!(
        format!("{}_entries_malformed_total", METRICS_PREFIX),
        Unit::Count,
        "Total listing entries dropped as unparseable"
    );

    describe_histogram!(
        format!("{}_ingest_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Batch ingest latency in seconds"
    );

    // Matcher metrics
    describe_counter!(
        format!("{}_local_papers_total", METRICS_PREFIX),
        Unit::Count,
        "Total papers attributed to local roster members"
    );

    // Engagement metrics
    describe_counter!(
        format!("{}_engagement_ops_total", METRICS_PREFIX),
        Unit::Count,
        "Total engagement operations by kind and outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record batch ingest metrics
pub struct IngestMetrics {
    start: Instant,
    kind: String,
}

impl IngestMetrics {
    /// Start tracking an ingest pass
    pub fn start(kind: &str) -> Self {
        Self {
            start: Instant::now(),
            kind: kind.to_string(),
        }
    }

    /// Record ingest completion
    pub fn finish(self, ingested: usize, skipped: usize) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_papers_ingested_total", METRICS_PREFIX),
            "kind" => self.kind.clone()
        )
        .increment(ingested as u64);

        counter!(
            format!("{}_papers_skipped_total", METRICS_PREFIX),
            "kind" => self.kind.clone()
        )
        .increment(skipped as u64);

        histogram!(
            format!("{}_ingest_duration_seconds", METRICS_PREFIX),
            "kind" => self.kind
        )
        .record(duration);
    }
}

/// Helper to record dropped listing entries
pub fn record_malformed_entries(count: usize) {
    if count > 0 {
        counter!(format!("{}_entries_malformed_total", METRICS_PREFIX)).increment(count as u64);
    }
}

/// Helper to record a locally attributed paper
pub fn record_local_paper(classification: &str) {
    counter!(
        format!("{}_local_papers_total", METRICS_PREFIX),
        "classification" => classification.to_string()
    )
    .increment(1);
}

/// Helper to record an engagement operation
pub fn record_engagement(op: &str, outcome: &str) {
    counter!(
        format!("{}_engagement_ops_total", METRICS_PREFIX),
        "op" => op.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in INGEST_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_ingest_metrics() {
        let metrics = IngestMetrics::start("new");
        metrics.finish(10, 2);
        // Just verify it runs without panic
    }
}
