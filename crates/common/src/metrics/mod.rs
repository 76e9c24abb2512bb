//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all FuelForge metrics
pub const METRICS_PREFIX: &str = "fuelforge";

/// Buckets for batch processing latency (PDF parsing and OCR are slow)
pub const PROCESSING_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 1m
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of uploaded files accepted"
    );

    describe_counter!(
        format!("{}_uploads_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of uploaded files rejected"
    );

    describe_counter!(
        format!("{}_invoices_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Total invoices processed"
    );

    describe_counter!(
        format!("{}_dockets_parsed_total", METRICS_PREFIX),
        Unit::Count,
        "Total shunt dockets parsed"
    );

    describe_counter!(
        format!("{}_ocr_pages_total", METRICS_PREFIX),
        Unit::Count,
        "Total PDF pages sent to OCR"
    );

    describe_counter!(
        format!("{}_rate_limited_total", METRICS_PREFIX),
        Unit::Count,
        "Total requests rejected by the rate limiter"
    );

    describe_histogram!(
        format!("{}_processing_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Batch processing latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Record an accepted or rejected upload
pub fn record_upload(kind: &str, accepted: bool) {
    let name = if accepted {
        format!("{}_uploads_total", METRICS_PREFIX)
    } else {
        format!("{}_uploads_rejected_total", METRICS_PREFIX)
    };
    counter!(name, "kind" => kind.to_string()).increment(1);
}

/// Record the outcome of one invoice
pub fn record_invoice(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        format!("{}_invoices_processed_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);
}

/// Record the outcome of one shunt docket
pub fn record_docket(success: bool) {
    let status = if success { "success" } else { "unrecognized" };
    counter!(
        format!("{}_dockets_parsed_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);
}

/// Record one OCR attempt
pub fn record_ocr(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        format!("{}_ocr_pages_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);
}

/// Record a request rejected by the rate limiter
pub fn record_rate_limited() {
    counter!(format!("{}_rate_limited_total", METRICS_PREFIX)).increment(1);
}

/// Times a processing batch
pub struct ProcessingTimer {
    start: Instant,
}

impl ProcessingTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    /// Record the elapsed time, returning it in seconds
    pub fn finish(self) -> f64 {
        let duration = self.start.elapsed().as_secs_f64();
        histogram!(format!("{}_processing_duration_seconds", METRICS_PREFIX)).record(duration);
        duration
    }
}
