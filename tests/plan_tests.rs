//! Integration tests for query plans against a live discovery engine.

mod common;

use std::collections::HashSet;

use keyroute::config::RouterConfig;
use keyroute::routing::{LiveNodes, QueryPlan};

use common::spawn_localnodes;

#[tokio::test]
async fn test_seeded_plan_is_stable_for_fixed_snapshot_and_seed() {
    let (addr, _server) = spawn_localnodes(|_| {
        Some(vec![
            "127.0.0.2".to_string(),
            "127.0.0.3".to_string(),
            "127.0.0.1".to_string(),
            "127.0.0.4".to_string(),
        ])
    })
    .await;

    let mut config = RouterConfig::with_seeds(["127.0.0.1"]);
    config.port = addr.port();
    let live = LiveNodes::new(&config).expect("engine builds");
    live.update_once().await;

    for seed in [0i64, 42, -7, i64::MAX, i64::MIN + 1] {
        let first: Vec<_> = QueryPlan::seeded(live.clone(), seed).collect();
        let second: Vec<_> = QueryPlan::seeded(live.clone(), seed).collect();
        assert_eq!(first, second, "seed {seed}");
        assert_eq!(first.len(), 4, "seed {seed}");
        let unique: HashSet<_> = first.iter().collect();
        assert_eq!(unique.len(), 4, "seed {seed}");
    }
}

#[tokio::test]
async fn test_seeded_plan_snapshot_is_pinned_at_first_draw() {
    let (addr, _server) = spawn_localnodes(|_| {
        Some(vec![
            "127.0.0.1".to_string(),
            "127.0.0.2".to_string(),
            "127.0.0.3".to_string(),
        ])
    })
    .await;

    let mut config = RouterConfig::with_seeds(["127.0.0.1"]);
    config.port = addr.port();
    let live = LiveNodes::new(&config).expect("engine builds");

    // First draw happens against the seed snapshot (one node); the refresh
    // that lands afterwards must not leak into this plan.
    let mut plan = QueryPlan::seeded(live.clone(), 42);
    let first = plan.next_node().expect("one node");
    assert_eq!(first.host, "127.0.0.1");

    live.update_once().await;
    assert_eq!(live.snapshot().len(), 3);

    assert!(plan.next_node().is_none(), "captured snapshot had one node");
}

#[tokio::test]
async fn test_unseeded_plan_sees_nodes_added_mid_iteration() {
    let (addr, _server) = spawn_localnodes(|_| {
        Some(vec![
            "127.0.0.1".to_string(),
            "127.0.0.2".to_string(),
            "127.0.0.3".to_string(),
        ])
    })
    .await;

    let mut config = RouterConfig::with_seeds(["127.0.0.1"]);
    config.port = addr.port();
    let live = LiveNodes::new(&config).expect("engine builds");

    let mut plan = QueryPlan::unseeded(live.clone());
    let first = plan.next_node().expect("seed node available");
    assert_eq!(first.host, "127.0.0.1");

    // Snapshot grows mid-iteration; the plan picks up the new nodes and
    // still never repeats one.
    live.update_once().await;

    let mut seen = vec![first];
    while let Some(node) = plan.next_node() {
        seen.push(node);
    }
    let hosts: HashSet<String> = seen.iter().map(|n| n.host.clone()).collect();
    assert_eq!(hosts.len(), seen.len(), "no node may repeat");
    assert_eq!(hosts.len(), 3);
}

#[tokio::test]
async fn test_plans_are_independent() {
    let (addr, _server) = spawn_localnodes(|_| {
        Some(vec!["127.0.0.1".to_string(), "127.0.0.2".to_string()])
    })
    .await;

    let mut config = RouterConfig::with_seeds(["127.0.0.1"]);
    config.port = addr.port();
    let live = LiveNodes::new(&config).expect("engine builds");
    live.update_once().await;

    // Draining one plan leaves another untouched.
    let mut a = QueryPlan::seeded(live.clone(), 9);
    let mut b = QueryPlan::seeded(live.clone(), 9);
    assert_eq!(a.by_ref().count(), 2);
    assert_eq!(b.by_ref().count(), 2);
}
