//! Prometheus metrics for the search service.
//!
//! Covers search requests by mode and outcome, end-to-end search latency,
//! hits removed by the exact-match filter, undecodable entries, and calls to
//! the document store.
//!
//! # Example
//! ```no_run
//! use chat_history_search::metrics::SEARCH_REQUESTS_TOTAL;
//!
//! SEARCH_REQUESTS_TOTAL
//!     .with_label_values(&["full_text", "success"])
//!     .inc();
//! ```
use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

const NAMESPACE: &str = "chat_history_search";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Search Metrics
    // ============================================================================

    /// Total number of search requests
    ///
    /// Labels: mode (full_text, filter_only), status (success, error)
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Total number of search requests")
            .namespace(NAMESPACE),
        &["mode", "status"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Search duration in seconds, from query build to annotated response
    pub static ref SEARCH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "search_duration_seconds",
            "Search duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    /// Hits returned by the store but dropped by the exact-match filter
    pub static ref SEARCH_HITS_FILTERED_TOTAL: Counter = Counter::with_opts(
        Opts::new("search_hits_filtered_total", "Hits removed by the exact-match filter")
            .namespace(NAMESPACE)
    ).expect("Failed to create SEARCH_HITS_FILTERED_TOTAL metric");

    /// Result entries that could not be decoded
    pub static ref SEARCH_ENTRIES_SKIPPED_TOTAL: Counter = Counter::with_opts(
        Opts::new("search_entries_skipped_total", "Search result entries skipped on decode failure")
            .namespace(NAMESPACE)
    ).expect("Failed to create SEARCH_ENTRIES_SKIPPED_TOTAL metric");

    // ============================================================================
    // Document Store Metrics
    // ============================================================================

    /// Total number of requests sent to the document store
    ///
    /// Labels: operation, status (success, error)
    pub static ref STORE_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("store_requests_total", "Total number of document store requests")
            .namespace(NAMESPACE),
        &["operation", "status"]
    ).expect("Failed to create STORE_REQUESTS_TOTAL metric");
}

fn register<M>(metric: &M) -> Result<(), prometheus::Error>
where
    M: prometheus::core::Collector + Clone + 'static,
{
    match PROMETHEUS_REGISTRY.register(Box::new(metric.clone())) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(&*SEARCH_REQUESTS_TOTAL)?;
    register(&*SEARCH_DURATION_SECONDS)?;
    register(&*SEARCH_HITS_FILTERED_TOTAL)?;
    register(&*SEARCH_ENTRIES_SKIPPED_TOTAL)?;
    register(&*STORE_REQUESTS_TOTAL)?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Generate Prometheus text format metrics for the /metrics endpoint
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
