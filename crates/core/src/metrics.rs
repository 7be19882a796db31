//! Prometheus metrics for a run.
//!
//! This module provides metrics for:
//! - Items by terminal state
//! - Resolution failures by reason
//! - Transfer duration
//! - Upload attempts and bytes

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Registry holding every lectern metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        // Names are static and unique; registration cannot collide.
        let _ = registry.register(metric);
    }
    registry
});

// =============================================================================
// Items
// =============================================================================

/// Items finished, by terminal state.
pub static ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lectern_items_total", "Items processed by terminal state"),
        &["state"], // "cleaned_up", "skipped", "failed"
    )
    .unwrap()
});

/// Resolution failures by reason.
pub static RESOLUTION_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lectern_resolution_failures_total",
            "Resolution failures by reason",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Transfer
// =============================================================================

/// Transfer duration in seconds.
pub static TRANSFER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "lectern_transfer_duration_seconds",
            "Duration of byte retrieval per item",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
        &["kind"], // "media", "playlist", "document", "unknown"
    )
    .unwrap()
});

// =============================================================================
// Upload
// =============================================================================

/// Store calls by outcome.
pub static UPLOAD_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lectern_upload_attempts_total", "Object store calls by outcome"),
        &["outcome"], // "success", "throttled", "error"
    )
    .unwrap()
});

/// Bytes committed to the store.
pub static UPLOADED_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("lectern_uploaded_bytes_total", "Bytes committed to the object store")
        .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ITEMS.clone()),
        Box::new(RESOLUTION_FAILURES.clone()),
        Box::new(TRANSFER_DURATION.clone()),
        Box::new(UPLOAD_ATTEMPTS.clone()),
        Box::new(UPLOADED_BYTES.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        ITEMS.with_label_values(&["skipped"]).inc();
        UPLOADED_BYTES.inc_by(10);

        let output = encode_metrics().unwrap();
        assert!(output.contains("lectern_items_total"));
        assert!(output.contains("lectern_uploaded_bytes_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_all_metrics_count() {
        assert_eq!(all_metrics().len(), 5);
    }
}
