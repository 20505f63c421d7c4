//! Metrics declaration and initialization.
//!
//! All recorders are no-ops unless the `metrics` feature is enabled.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of pages assembled entirely from the checkpoint cache.
    pub static ref PAGE_CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "tailcast_page_cache_hit_count",
            "Total number of pages assembled from the checkpoint cache without a store round."
        );
        "tailcast_page_cache_hit_count"
    };
    /// Track number of fetches issued against the commit store.
    pub static ref STORE_POLL_COUNTER: &'static str = {
        metrics::describe_counter!(
            "tailcast_store_poll_count",
            "Total number of fetches issued against the backing commit store."
        );
        "tailcast_store_poll_count"
    };
    /// Track number of store fetches that failed and were retried silently.
    pub static ref STORE_POLL_FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "tailcast_store_poll_failure_count",
            "Total number of store fetches that failed and were reported as empty."
        );
        "tailcast_store_poll_failure_count"
    };
    /// Track number of preload rounds opened.
    pub static ref PRELOAD_COUNTER: &'static str = {
        metrics::describe_counter!(
            "tailcast_preload_count",
            "Total number of fire-and-forget preload rounds opened."
        );
        "tailcast_preload_count"
    };
    /// Track number of pages delivered to observers.
    pub static ref PAGES_DELIVERED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "tailcast_pages_delivered_count",
            "Total number of pages delivered to subscription observers."
        );
        "tailcast_pages_delivered_count"
    };
    /// Track number of live subscriptions.
    pub static ref SUBSCRIPTIONS_ACTIVE_GAUGE: &'static str = {
        metrics::describe_gauge!(
            "tailcast_subscriptions_active",
            "Number of currently registered subscriptions."
        );
        "tailcast_subscriptions_active"
    };
}

#[cfg(feature = "metrics")]
pub(crate) fn record_page_cache_hit() {
    metrics::counter!(*PAGE_CACHE_HIT_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_page_cache_hit() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_store_poll() {
    metrics::counter!(*STORE_POLL_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_store_poll() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_store_poll_failure() {
    metrics::counter!(*STORE_POLL_FAILURE_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_store_poll_failure() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_preload() {
    metrics::counter!(*PRELOAD_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_preload() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_page_delivered() {
    metrics::counter!(*PAGES_DELIVERED_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_page_delivered() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_subscription_registered() {
    metrics::gauge!(*SUBSCRIPTIONS_ACTIVE_GAUGE).increment(1.0);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_subscription_registered() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_subscription_removed() {
    metrics::gauge!(*SUBSCRIPTIONS_ACTIVE_GAUGE).decrement(1.0);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_subscription_removed() {}
