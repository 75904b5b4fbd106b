//! The per-request integration point with the SDK's execution pipeline.
//!
//! The pipeline calls [`RequestRouter::prepare`] once before executing a
//! request and [`RequestRouter::apply`] each time the request is about to go
//! on the wire (including retries). `prepare` decides how nodes will be
//! ordered for this request; `apply` pops the next node and rewrites the
//! request's target. Neither hook has side effects beyond the route slot and
//! the endpoint it is handed.
//!
//! Seeding is best-effort: if any link of the affinity chain is unavailable
//! (ineligible operation, unknown partition-key name, missing key value),
//! the request falls back to an unseeded load-balancing plan rather than
//! failing. An unknown key name additionally kicks off background discovery
//! so a later request for the same table can be seeded.

use std::sync::Arc;

use tracing::debug;

use crate::hash::hash_attr;
use crate::routing::classify::{self, AffinityMode};
use crate::routing::discovery::LiveNodes;
use crate::routing::keycache::{PartitionKeyCache, TableMetadata};
use crate::routing::metrics;
use crate::routing::plan::QueryPlan;
use crate::routing::request::DbRequest;
use crate::types::NodeAddress;

/// Routing state carried alongside one in-flight request.
///
/// Single-use and not shareable across requests, like the plan it wraps.
#[derive(Debug)]
pub struct PlannedRoute {
    plan: QueryPlan,
}

impl PlannedRoute {
    /// Whether this route was seeded for key affinity.
    pub fn is_seeded(&self) -> bool {
        self.plan.is_seeded()
    }
}

/// Builds a query plan per request and rewrites request targets.
pub struct RequestRouter {
    live: Arc<LiveNodes>,
    keys: Arc<PartitionKeyCache>,
    metadata: Arc<dyn TableMetadata>,
    mode: AffinityMode,
}

impl RequestRouter {
    /// Wire a router out of its collaborators.
    pub fn new(
        live: Arc<LiveNodes>,
        keys: Arc<PartitionKeyCache>,
        metadata: Arc<dyn TableMetadata>,
        mode: AffinityMode,
    ) -> Self {
        RequestRouter {
            live,
            keys,
            metadata,
            mode,
        }
    }

    /// The "before execution" hook: build this request's query plan.
    pub fn prepare(&self, request: &DbRequest) -> PlannedRoute {
        if classify::should_apply(self.mode, request) {
            if let Some(table) = request.table_name() {
                match self.keys.partition_key_name(table) {
                    Some(key_name) => {
                        if let Some(value) = request.partition_key_value(&key_name) {
                            let seed = hash_attr(Some(value));
                            debug!(
                                op = request.operation_name(),
                                table,
                                seed,
                                "Built seeded query plan"
                            );
                            return PlannedRoute {
                                plan: QueryPlan::seeded(self.live.clone(), seed),
                            };
                        }
                        debug!(
                            op = request.operation_name(),
                            table,
                            key = %key_name,
                            "Request carries no partition-key value; using unseeded plan"
                        );
                    }
                    None => {
                        // Unknown key name: this request load-balances, a
                        // later one can be seeded once discovery lands.
                        self.keys.trigger_discovery(table, self.metadata.clone());
                    }
                }
            }
        }
        PlannedRoute {
            plan: QueryPlan::unseeded(self.live.clone()),
        }
    }

    /// The "on transmission" hook: point `target` at the plan's next node.
    ///
    /// When the plan is exhausted the target is left unchanged: the request
    /// still goes somewhere, and the caller's retry loop sees exhaustion
    /// through the plan, not through a routing failure.
    pub fn apply(&self, route: &mut PlannedRoute, target: &mut NodeAddress) {
        match route.plan.next_node() {
            Some(node) => {
                debug!(node = %node, "Routing request");
                *target = node;
            }
            None => {
                metrics::record_plan_exhausted();
                debug!("Query plan exhausted; leaving request target unchanged");
            }
        }
    }

    /// The configured affinity mode.
    pub fn mode(&self) -> AffinityMode {
        self.mode
    }
}

impl std::fmt::Debug for RequestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRouter")
            .field("mode", &self.mode)
            .field("live", &self.live)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
