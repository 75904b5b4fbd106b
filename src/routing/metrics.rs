//! Prometheus metrics for the routing layer.
//!
//! Metrics cover:
//! - Discovery refresh cycles (outcome per scope) and scope fallbacks
//! - The current live-node count
//! - Partition-key cache lookups and discovery outcomes
//! - Metadata-lookup retry attempts
//! - Query plan construction and exhaustion
//!
//! # Safety
//!
//! All metrics are registered to a custom registry with the "keyroute"
//! prefix to avoid name collisions with other libraries using the default
//! Prometheus registry. Registration errors are handled gracefully: if a
//! metric fails to register, an unregistered fallback is used instead of
//! panicking.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder, opts,
};
use tracing::warn;

/// Custom Prometheus registry for keyroute metrics.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("keyroute".to_string()), None).unwrap_or_else(|_| Registry::new())
});

// =============================================================================
// Discovery metrics
// =============================================================================

/// Discovery refresh attempts per scope and outcome
/// (outcome = published / empty / error).
pub static DISCOVERY_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "discovery_refreshes_total",
        "Discovery refresh attempts by scope and outcome",
        &["scope", "outcome"],
    )
});

/// Scope fallback events (the named scope yielded nothing and the walk
/// descended to its fallback).
pub static DISCOVERY_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "discovery_fallbacks_total",
        "Scope fallback events during discovery",
        &["scope"],
    )
});

/// Number of nodes in the current live snapshot.
pub static LIVE_NODES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_safe(
        &REGISTRY,
        "live_nodes",
        "Number of nodes in the current live snapshot",
    )
});

// =============================================================================
// Partition-key metrics
// =============================================================================

/// Partition-key cache lookups (result = hit / miss).
pub static KEY_CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "key_cache_lookups_total",
        "Partition-key cache lookups by result",
        &["result"],
    )
});

/// Partition-key discovery outcomes
/// (outcome = resolved / failed / short_circuited).
pub static KEY_DISCOVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "key_discoveries_total",
        "Partition-key discovery outcomes",
        &["outcome"],
    )
});

/// Metadata-lookup retry attempts by outcome
/// (outcome = attempt / success / exhausted).
pub static RETRY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "retry_attempts_total",
        "Metadata-lookup retry attempts by outcome",
        &["policy", "outcome"],
    )
});

// =============================================================================
// Query plan metrics
// =============================================================================

/// Query plans built per mode (mode = seeded / unseeded).
pub static PLANS_BUILT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "query_plans_total",
        "Query plans built by selection mode",
        &["mode"],
    )
});

/// Requests transmitted with an already-exhausted plan (target left as-is).
pub static PLANS_EXHAUSTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter_safe(
        &REGISTRY,
        "plans_exhausted_total",
        "Transmissions that found the query plan exhausted",
    )
});

// =============================================================================
// Recording helpers
// =============================================================================

/// Record a discovery refresh outcome for a scope.
pub fn record_refresh(scope: &str, outcome: &str) {
    DISCOVERY_REFRESHES.with_label_values(&[scope, outcome]).inc();
}

/// Record a fallback from the named scope.
pub fn record_fallback(scope: &str) {
    DISCOVERY_FALLBACKS.with_label_values(&[scope]).inc();
}

/// Update the live-node gauge.
pub fn set_live_nodes(count: usize) {
    LIVE_NODES.set(count as i64);
}

/// Record a partition-key cache lookup.
pub fn record_key_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    KEY_CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

/// Record a partition-key discovery outcome.
pub fn record_key_discovery(outcome: &str) {
    KEY_DISCOVERIES.with_label_values(&[outcome]).inc();
}

/// Record a metadata-lookup retry attempt.
pub fn record_retry_attempt(policy: &str) {
    RETRY_ATTEMPTS.with_label_values(&[policy, "attempt"]).inc();
}

/// Record a metadata-lookup retry success.
pub fn record_retry_success(policy: &str) {
    RETRY_ATTEMPTS.with_label_values(&[policy, "success"]).inc();
}

/// Record a metadata-lookup retry exhaustion.
pub fn record_retry_exhausted(policy: &str) {
    RETRY_ATTEMPTS
        .with_label_values(&[policy, "exhausted"])
        .inc();
}

/// Record construction of a query plan.
pub fn record_plan_built(seeded: bool) {
    let mode = if seeded { "seeded" } else { "unseeded" };
    PLANS_BUILT.with_label_values(&[mode]).inc();
}

/// Record a transmission that found its plan exhausted.
pub fn record_plan_exhausted() {
    PLANS_EXHAUSTED.inc();
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

// ============================================================================
// Safe metric registration helpers
// ============================================================================

/// Register an IntCounterVec safely, returning an unregistered fallback on error.
fn register_int_counter_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntCounterVec {
    let counter =
        IntCounterVec::new(opts!(name, help), labels).expect("metric opts should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounterVec metric, using unregistered fallback");
            counter
        }
    }
}

/// Register an IntCounter safely, returning an unregistered fallback on error.
fn register_int_counter_safe(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("metric name/help should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounter metric, using unregistered fallback");
            counter
        }
    }
}

/// Register an IntGauge safely, returning an unregistered fallback on error.
fn register_int_gauge_safe(registry: &Registry, name: &str, help: &str) -> IntGauge {
    let gauge = IntGauge::new(name, help).expect("metric name/help should be valid");
    match registry.register(Box::new(gauge.clone())) {
        Ok(()) => gauge,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntGauge metric, using unregistered fallback");
            gauge
        }
    }
}
