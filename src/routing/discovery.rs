//! Background node discovery and the live-node snapshot.
//!
//! [`LiveNodes`] owns the authoritative list of live coordinator addresses.
//! A background task periodically re-queries the cluster's `/localnodes`
//! endpoint through the configured scope chain, publishing each non-empty
//! result as a new immutable snapshot. Request-serving code only ever reads
//! the snapshot; it never blocks on discovery.
//!
//! # Refresh cycle
//!
//! Each cycle walks the scope chain narrowest-first: query with the scope's
//! filter; a non-empty node list is published and the walk stops; an empty
//! result or a transport error logs and falls through to the scope's
//! fallback. If the whole chain comes up empty the previous snapshot is kept
//! unchanged; an empty snapshot is never published over a non-empty one.
//! Errors are never fatal to the loop.
//!
//! # Concurrency
//!
//! The snapshot is published by replacing an `Arc<Vec<NodeAddress>>` behind
//! an `RwLock`; readers clone the `Arc` and observe either the previous or
//! the next complete list, never a partial one. The round-robin cursor is a
//! single shared atomic, wrapping modulo the current snapshot size. The
//! refresh task holds only a `Weak` reference, so dropping the last handle
//! to the engine ends the loop and the task never blocks process exit.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::constants::{DISCOVERY_PATH, DISCOVERY_POOL_MAX_IDLE_PER_HOST, PROBE_RACK_NAME};
use crate::error::{Error, Result};
use crate::routing::metrics;
use crate::routing::scope::RoutingScope;
use crate::types::{NodeAddress, Scheme};

/// Discovery engine: owns the live-node snapshot and keeps it fresh.
pub struct LiveNodes {
    scheme: Scheme,
    port: u16,
    scope: Arc<RoutingScope>,
    refresh_interval: Duration,
    /// Current snapshot; replaced whole, never mutated in place.
    nodes: RwLock<Arc<Vec<NodeAddress>>>,
    /// Round-robin cursor over the snapshot. Wraps via modulo on read.
    next_index: AtomicUsize,
    /// Whether the refresh task has been started.
    started: AtomicBool,
    /// Handle of the refresh task, kept for explicit stop/abort.
    refresher: Mutex<Option<JoinHandle<()>>>,
    /// Weak self-handle for the refresh task, set at construction.
    self_ref: Weak<LiveNodes>,
    http: reqwest::Client,
}

impl LiveNodes {
    /// Build an engine from configuration.
    ///
    /// Validates the configuration (including that every seed host forms a
    /// valid discovery URI) and installs the seed hosts as the initial
    /// snapshot. No background work starts until [`start`](Self::start).
    pub fn new(config: &RouterConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let scope = RoutingScope::from_topology(config.datacenter.as_deref(), config.rack.as_deref())?;
        let seeds = config.seed_addresses();

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(DISCOVERY_POOL_MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        info!(
            seeds = seeds.len(),
            scope = %scope,
            refresh_interval_ms = config.refresh_interval.as_millis() as u64,
            "Creating node discovery engine"
        );
        metrics::set_live_nodes(seeds.len());

        Ok(Arc::new_cyclic(|self_ref| LiveNodes {
            scheme: config.scheme,
            port: config.port,
            scope,
            refresh_interval: config.refresh_interval,
            nodes: RwLock::new(Arc::new(seeds)),
            next_index: AtomicUsize::new(0),
            started: AtomicBool::new(false),
            refresher: Mutex::new(None),
            self_ref: self_ref.clone(),
            http,
        }))
    }

    /// Start the background refresh task.
    ///
    /// Idempotent: a second call while the task is running is a no-op, so at
    /// most one refresh loop exists per engine.
    pub fn start(&self) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Discovery refresh task already running");
            return;
        }

        let weak = self.self_ref.clone();
        let interval = self.refresh_interval;
        let handle = tokio::spawn(async move {
            refresh_loop(weak, interval).await;
        });

        *lock(&self.refresher) = Some(handle);
        info!("Started discovery refresh task");
    }

    /// Stop the background refresh task.
    ///
    /// The current snapshot stays available; only the refreshing stops. The
    /// engine can be started again afterwards.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.refresher).take() {
            handle.abort();
        }
        if self.started.swap(false, Ordering::SeqCst) {
            info!("Stopped discovery refresh task");
        }
    }

    /// The current live-node snapshot. Non-blocking; never partial.
    pub fn snapshot(&self) -> Arc<Vec<NodeAddress>> {
        read_lock(&self.nodes).clone()
    }

    /// Next node in round-robin order over the current snapshot.
    ///
    /// Errors with [`Error::NoLiveNodes`] when the snapshot is empty, since
    /// there is nothing to route to.
    pub fn next_address(&self) -> Result<NodeAddress> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Err(Error::NoLiveNodes);
        }
        let i = self.next_index.fetch_add(1, Ordering::Relaxed) % snapshot.len();
        Ok(snapshot[i].clone())
    }

    /// Run one refresh pass now, walking the scope chain.
    ///
    /// Returns the number of nodes published, or 0 if the whole chain came
    /// up empty and the previous snapshot was kept. Used by the background
    /// loop, and directly to prime the snapshot before serving traffic.
    pub async fn update_once(&self) -> usize {
        for scope in self.scope.chain() {
            match self.fetch_nodes(scope.local_filter()).await {
                Ok(nodes) if !nodes.is_empty() => {
                    let count = nodes.len();
                    *write_lock(&self.nodes) = Arc::new(nodes);
                    // Fresh list, fresh rotation.
                    self.next_index.store(0, Ordering::Relaxed);
                    metrics::record_refresh(scope.name(), "published");
                    metrics::set_live_nodes(count);
                    debug!(scope = %scope, nodes = count, "Published live-node snapshot");
                    return count;
                }
                Ok(_) => {
                    metrics::record_refresh(scope.name(), "empty");
                    if scope.fallback().is_some() {
                        metrics::record_fallback(scope.name());
                        warn!(scope = %scope, "No nodes for scope, falling back to broader scope");
                    }
                }
                Err(e) => {
                    metrics::record_refresh(scope.name(), "error");
                    if scope.fallback().is_some() {
                        metrics::record_fallback(scope.name());
                    }
                    warn!(scope = %scope, error = %e, "Discovery query failed");
                }
            }
        }
        warn!("Discovery found no nodes in any scope; keeping previous snapshot");
        0
    }

    /// Does the discovery endpoint support scope filtering at all?
    ///
    /// Queries once unfiltered and once with an intentionally-bogus rack
    /// name; a server that honors filters returns a different (smaller)
    /// result for the bogus rack. Servers that ignore unknown filters return
    /// identical lists, which reads as "not supported".
    pub async fn rack_filtering_supported(&self) -> Result<bool> {
        let unfiltered = self.fetch_nodes("").await?;
        let probe_filter = format!("rack={PROBE_RACK_NAME}");
        let probed = self.fetch_nodes(&probe_filter).await?;
        Ok(unfiltered.len() != probed.len())
    }

    /// Does the configured scope return at least one node?
    ///
    /// A false result usually means a misconfigured datacenter or rack name.
    pub async fn scope_returns_nodes(&self) -> Result<bool> {
        let nodes = self.fetch_nodes(self.scope.local_filter()).await?;
        Ok(!nodes.is_empty())
    }

    /// Fetch the node list from one current node, with a scope filter.
    ///
    /// Non-success statuses and malformed bodies read as "no nodes";
    /// malformed individual entries are skipped with a warning rather than
    /// failing the whole refresh.
    async fn fetch_nodes(&self, filter: &str) -> Result<Vec<NodeAddress>> {
        let base = self.next_address()?;
        let mut uri = base.uri_for(DISCOVERY_PATH);
        if !filter.is_empty() {
            uri.push('?');
            uri.push_str(filter);
        }

        let response = self.http.get(&uri).send().await?;
        if !response.status().is_success() {
            warn!(uri = %uri, status = %response.status(), "Discovery endpoint returned non-success status");
            return Ok(Vec::new());
        }

        let entries: Vec<serde_json::Value> = response.json().await?;
        let mut nodes = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.parse_entry(&entry) {
                Some(node) => nodes.push(node),
                None => {
                    warn!(entry = %entry, "Skipping malformed discovery entry");
                }
            }
        }
        Ok(nodes)
    }

    /// Turn one discovery-response entry into a node address.
    fn parse_entry(&self, entry: &serde_json::Value) -> Option<NodeAddress> {
        let host = entry.as_str()?.trim();
        if host.is_empty() {
            return None;
        }
        let node = NodeAddress::new(self.scheme, host, self.port);
        // The response is only trusted as far as it forms a valid URI whose
        // host round-trips cleanly.
        let uri = node.uri_for(DISCOVERY_PATH);
        let parsed = reqwest::Url::parse(&uri).ok()?;
        let clean = parsed.host_str() == Some(host)
            || parsed.host_str() == Some(host.to_ascii_lowercase().as_str());
        if !clean {
            return None;
        }
        Some(node)
    }
}

impl Drop for LiveNodes {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.refresher).take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for LiveNodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveNodes")
            .field("scope", &self.scope.description())
            .field("nodes", &self.snapshot().len())
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish()
    }
}

/// The refresh loop body. Holds only a `Weak` so the engine can be dropped
/// while the loop is sleeping; the next tick then exits.
async fn refresh_loop(engine: Weak<LiveNodes>, interval: Duration) {
    loop {
        match engine.upgrade() {
            Some(live) => {
                live.update_once().await;
            }
            None => {
                debug!("Discovery engine dropped; refresh task exiting");
                return;
            }
        }
        tokio::time::sleep(interval).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;

    fn engine(hosts: &[&str]) -> Arc<LiveNodes> {
        let config = RouterConfig::with_seeds(hosts.to_vec());
        LiveNodes::new(&config).expect("engine should build")
    }

    #[test]
    fn test_seeds_form_initial_snapshot() {
        let live = engine(&["127.0.0.2", "127.0.0.3", "127.0.0.1"]);
        let snapshot = live.snapshot();
        let hosts: Vec<&str> = snapshot.iter().map(|n| n.host.as_str()).collect();
        assert_eq!(hosts, vec!["127.0.0.2", "127.0.0.3", "127.0.0.1"]);
    }

    #[test]
    fn test_round_robin_wraps() {
        let live = engine(&["127.0.0.2", "127.0.0.3", "127.0.0.1"]);
        let picked: Vec<String> = (0..4)
            .map(|_| live.next_address().expect("nodes available").host)
            .collect();
        assert_eq!(picked, vec!["127.0.0.2", "127.0.0.3", "127.0.0.1", "127.0.0.2"]);
    }

    #[test]
    fn test_empty_seed_list_rejected() {
        let config = RouterConfig::default();
        assert!(LiveNodes::new(&config).is_err());
    }

    #[test]
    fn test_invalid_seed_host_rejected() {
        let config = RouterConfig::with_seeds(["not a host"]);
        assert!(LiveNodes::new(&config).is_err());
    }

    #[test]
    fn test_parse_entry_rejects_garbage() {
        let live = engine(&["127.0.0.1"]);
        assert!(live.parse_entry(&serde_json::json!("")).is_none());
        assert!(live.parse_entry(&serde_json::json!(17)).is_none());
        assert!(live.parse_entry(&serde_json::json!(null)).is_none());
        assert!(live.parse_entry(&serde_json::json!("bad host")).is_none());
        assert!(live.parse_entry(&serde_json::json!("127.0.0.9")).is_some());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let live = engine(&["127.0.0.1"]);
        live.start();
        live.start();
        // One task handle, still running.
        assert!(lock(&live.refresher).as_ref().is_some());
        live.stop();
        assert!(lock(&live.refresher).is_none());
    }

    #[tokio::test]
    async fn test_stop_then_restart() {
        let live = engine(&["127.0.0.1"]);
        live.start();
        live.stop();
        live.start();
        assert!(lock(&live.refresher).is_some());
        live.stop();
    }
}
