//! Per-request query plans: which nodes to try, in what order.
//!
//! A query plan is a single-use, per-request iterator over candidate nodes.
//! Every plan yields each node at most once and signals exhaustion by
//! returning `None`, so callers driving retry loops can tell "no more nodes
//! to try" apart from "discovery failed"
//! ([`crate::error::Error::NoLiveNodes`]).
//!
//! Two selection modes share the contract:
//!
//! - **Unseeded** (general load balancing): re-reads the live snapshot on
//!   every draw, filters out nodes already returned, and samples uniformly
//!   from the remainder. A node added mid-iteration may appear; a removed
//!   one is simply skipped.
//! - **Seeded** (key affinity): captures one snapshot at first access and
//!   draws with the reproducible PRNG using pick-and-remove (swap the
//!   selected element with the last, shrink by one). For a fixed snapshot
//!   and seed the sequence is identical across runs and across client
//!   implementations.
//!
//! Plans are deliberately not `Sync`: one plan belongs to exactly one
//! in-flight request.

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;

use crate::prng::AffinityRng;
use crate::routing::discovery::LiveNodes;
use crate::routing::metrics;
use crate::types::NodeAddress;

/// A single-use ordering of candidate nodes for one request.
#[derive(Debug)]
pub enum QueryPlan {
    /// Load-balancing plan: uniform sampling over the live snapshot.
    Unseeded(UnseededPlan),
    /// Key-affinity plan: reproducible pick-without-replacement.
    Seeded(SeededPlan),
}

impl QueryPlan {
    /// Build an unseeded (uniformly sampling) plan.
    pub fn unseeded(live: Arc<LiveNodes>) -> Self {
        metrics::record_plan_built(false);
        QueryPlan::Unseeded(UnseededPlan {
            live,
            returned: HashSet::new(),
        })
    }

    /// Build a seeded (reproducible) plan for a routing seed.
    pub fn seeded(live: Arc<LiveNodes>, seed: i64) -> Self {
        metrics::record_plan_built(true);
        QueryPlan::Seeded(SeededPlan {
            live,
            seed,
            rng: AffinityRng::new(seed),
            remaining: None,
        })
    }

    /// Whether this plan was seeded for key affinity.
    pub fn is_seeded(&self) -> bool {
        matches!(self, QueryPlan::Seeded(_))
    }

    /// Next node to try, or `None` once every node has been returned.
    pub fn next_node(&mut self) -> Option<NodeAddress> {
        match self {
            QueryPlan::Unseeded(plan) => plan.next_node(),
            QueryPlan::Seeded(plan) => plan.next_node(),
        }
    }

    /// Restore the plan to its pristine state.
    ///
    /// A reset seeded plan replays exactly the same sequence for the same
    /// snapshot; a reset unseeded plan forgets which nodes it returned.
    pub fn reset(&mut self) {
        match self {
            QueryPlan::Unseeded(plan) => plan.returned.clear(),
            QueryPlan::Seeded(plan) => {
                plan.rng.reseed(plan.seed);
                plan.remaining = None;
            }
        }
    }
}

impl Iterator for QueryPlan {
    type Item = NodeAddress;

    fn next(&mut self) -> Option<NodeAddress> {
        self.next_node()
    }
}

/// Uniformly sampling plan over the (possibly changing) live snapshot.
#[derive(Debug)]
pub struct UnseededPlan {
    live: Arc<LiveNodes>,
    /// Nodes already handed out by this plan.
    returned: HashSet<NodeAddress>,
}

impl UnseededPlan {
    fn next_node(&mut self) -> Option<NodeAddress> {
        let snapshot = self.live.snapshot();
        let candidates: Vec<&NodeAddress> = snapshot
            .iter()
            .filter(|n| !self.returned.contains(*n))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let picked = candidates[rand::thread_rng().gen_range(0..candidates.len())].clone();
        self.returned.insert(picked.clone());
        Some(picked)
    }
}

/// Reproducible pick-without-replacement plan over one captured snapshot.
#[derive(Debug)]
pub struct SeededPlan {
    live: Arc<LiveNodes>,
    seed: i64,
    rng: AffinityRng,
    /// Captured at first draw; `swap_remove` consumes it pick by pick.
    remaining: Option<Vec<NodeAddress>>,
}

impl SeededPlan {
    fn next_node(&mut self) -> Option<NodeAddress> {
        let live = &self.live;
        let remaining = self
            .remaining
            .get_or_insert_with(|| live.snapshot().as_ref().clone());
        if remaining.is_empty() {
            return None;
        }
        let i = self.rng.intn(remaining.len() as i64) as usize;
        Some(remaining.swap_remove(i))
    }
}
