use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Feed requests by context (global, group, profile, following).
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_feed_requests_total",
        "Total feed requests segmented by feed context",
        &["context"]
    )
    .expect("failed to register blog_feed_requests_total");

    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blog_feed_request_duration_seconds",
        "Feed composition duration segmented by feed context",
        &["context"]
    )
    .expect("failed to register blog_feed_request_duration_seconds");

    /// Whole-response cache events (hit/miss/store/clear/error).
    pub static ref PAGE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "blog_page_cache_events_total",
        "Page cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register blog_page_cache_events_total");

    /// Content and follow-graph mutations by kind and outcome.
    pub static ref MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_mutations_total",
        "Mutations segmented by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("failed to register blog_mutations_total");
}

/// Record a mutation result under `kind`.
pub fn record_mutation<T>(kind: &str, result: &crate::error::Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(crate::error::AppError::Validation(_)) => "invalid",
        Err(crate::error::AppError::Forbidden(_)) => "forbidden",
        Err(crate::error::AppError::SelfFollowRejected) => "rejected",
        Err(e) if e.is_not_found() => "not_found",
        Err(_) => "error",
    };
    MUTATIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}
