//! Integration tests for partition-key discovery: deduplication, retry
//! classification, and failure cooldowns.

mod common;

use std::sync::Arc;
use std::time::Duration;

use keyroute::error::MetadataError;
use keyroute::routing::PartitionKeyCache;

use common::{MetadataScript, ScriptedMetadata, wait_until};

fn cache(cooldown_ms: u64, retries: usize) -> Arc<PartitionKeyCache> {
    PartitionKeyCache::new(Duration::from_millis(cooldown_ms), retries)
}

#[tokio::test]
async fn test_discovery_resolves_hash_key() {
    let cache = cache(60_000, 3);
    let metadata = ScriptedMetadata::new(vec![MetadataScript::HashKey("order_id")]);

    assert!(cache.trigger_discovery("orders", metadata.clone()));

    let probe = cache.clone();
    wait_until("key to resolve", 2_000, move || {
        probe.partition_key_name("orders").is_some()
    })
    .await;

    assert_eq!(
        cache.partition_key_name("orders"),
        Some("order_id".to_string())
    );
    assert_eq!(metadata.call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_triggers_make_one_call() {
    let cache = cache(60_000, 3);
    // Hold the lookup in flight long enough for the re-triggers to land.
    let metadata =
        ScriptedMetadata::with_delay(vec![MetadataScript::HashKey("order_id")], 200);

    let started: Vec<bool> = (0..3)
        .map(|_| cache.trigger_discovery("orders", metadata.clone()))
        .collect();
    assert_eq!(started, vec![true, false, false]);

    let probe = cache.clone();
    wait_until("key to resolve", 2_000, move || {
        probe.partition_key_name("orders").is_some()
    })
    .await;

    assert_eq!(metadata.call_count(), 1, "exactly one outbound lookup");
}

#[tokio::test]
async fn test_not_found_is_permanent_and_cooldown_gated() {
    let cache = cache(60_000, 3);
    let metadata = ScriptedMetadata::new(vec![MetadataScript::Fail(
        MetadataError::TableNotFound("missing".into()),
    )]);

    assert!(cache.trigger_discovery("missing", metadata.clone()));

    let probe = metadata.clone();
    wait_until("failed lookup to finish", 2_000, move || {
        probe.call_count() == 1
    })
    .await;
    // Give the failure marker a moment to land after the call returns.
    let probe = cache.clone();
    wait_until("failure marker", 2_000, move || {
        probe.failure_pending("missing")
    })
    .await;

    // One attempt total: permanent errors never retry.
    assert_eq!(metadata.call_count(), 1);
    assert_eq!(cache.partition_key_name("missing"), None);

    // Inside the cooldown a re-trigger performs zero additional attempts.
    assert!(!cache.trigger_discovery("missing", metadata.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(metadata.call_count(), 1);
}

#[tokio::test]
async fn test_clear_failure_restores_eligibility() {
    let cache = cache(60_000, 0);
    let metadata = ScriptedMetadata::new(vec![
        MetadataScript::Fail(MetadataError::AccessDenied("orders".into())),
        MetadataScript::HashKey("order_id"),
    ]);

    assert!(cache.trigger_discovery("orders", metadata.clone()));
    let probe = metadata.clone();
    wait_until("first lookup", 2_000, move || probe.call_count() == 1).await;
    let probe = cache.clone();
    wait_until("failure marker", 2_000, move || {
        probe.failure_pending("orders")
    })
    .await;

    assert!(!cache.trigger_discovery("orders", metadata.clone()));

    cache.clear_failure("orders");
    assert!(cache.trigger_discovery("orders", metadata.clone()));

    let probe = cache.clone();
    wait_until("key to resolve", 2_000, move || {
        probe.partition_key_name("orders").is_some()
    })
    .await;
    assert_eq!(metadata.call_count(), 2);
}

#[tokio::test]
async fn test_cooldown_expiry_reenables_discovery() {
    let cache = cache(50, 0);
    let metadata = ScriptedMetadata::new(vec![
        MetadataScript::Fail(MetadataError::Other("boom".into())),
        MetadataScript::HashKey("order_id"),
    ]);

    assert!(cache.trigger_discovery("orders", metadata.clone()));
    let probe = metadata.clone();
    wait_until("first lookup", 2_000, move || probe.call_count() == 1).await;
    let probe = cache.clone();
    wait_until("failure marker", 2_000, move || {
        probe.failure_pending("orders")
    })
    .await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(
        cache.trigger_discovery("orders", metadata.clone()),
        "cooldown elapsed; rediscovery allowed"
    );
    let probe = cache.clone();
    wait_until("key to resolve", 2_000, move || {
        probe.partition_key_name("orders").is_some()
    })
    .await;
}

#[tokio::test]
async fn test_transient_failures_retry_to_success() {
    let cache = cache(60_000, 3);
    let metadata = ScriptedMetadata::new(vec![
        MetadataScript::Fail(MetadataError::Throttled("busy".into())),
        MetadataScript::Fail(MetadataError::Server("500".into())),
        MetadataScript::HashKey("order_id"),
    ]);

    assert!(cache.trigger_discovery("orders", metadata.clone()));

    let probe = cache.clone();
    wait_until("key to resolve", 10_000, move || {
        probe.partition_key_name("orders").is_some()
    })
    .await;
    assert_eq!(metadata.call_count(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_install_cooldown() {
    let cache = cache(60_000, 1);
    let metadata =
        ScriptedMetadata::new(vec![MetadataScript::Fail(MetadataError::Server("500".into()))]);

    assert!(cache.trigger_discovery("orders", metadata.clone()));

    let probe = metadata.clone();
    wait_until("retries to exhaust", 10_000, move || probe.call_count() == 2).await;
    let probe = cache.clone();
    wait_until("failure marker", 2_000, move || {
        probe.failure_pending("orders")
    })
    .await;

    // Exhaustion behaves like a permanent failure until the cooldown lapses.
    assert!(!cache.trigger_discovery("orders", metadata.clone()));
    assert_eq!(metadata.call_count(), 2);
}

#[tokio::test]
async fn test_static_seed_short_circuits_discovery() {
    let cache = cache(60_000, 3);
    cache.seed("orders", "order_id");

    let metadata = ScriptedMetadata::new(vec![MetadataScript::HashKey("wrong")]);
    assert!(!cache.trigger_discovery("orders", metadata.clone()));
    assert_eq!(metadata.call_count(), 0);
    assert_eq!(
        cache.partition_key_name("orders"),
        Some("order_id".to_string())
    );
}
