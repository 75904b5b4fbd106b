//! Partition-key discovery and caching.
//!
//! Key-affinity routing needs to know which attribute is a table's partition
//! key. [`PartitionKeyCache`] keeps a per-table cache of resolved key names,
//! discovers unknown ones asynchronously through a "describe table" metadata
//! lookup, and remembers failures with a cooldown so hot request paths never
//! pile lookups onto a table that just failed.
//!
//! # Entry lifecycle
//!
//! ```text
//! absent ──trigger──▶ Discovering ──ok──▶ Resolved (kept forever)
//!                          │
//!                          └──err──▶ Failed{retry_at} ──cooldown──▶ absent-ish
//! ```
//!
//! At most one discovery task runs per table: claiming the `Discovering`
//! slot is an atomic entry transition, so concurrent triggers for the same
//! table produce exactly one outbound lookup. Retry backoff sleeps happen on
//! the spawned discovery task, never on a request thread.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backon::Retryable;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use crate::error::MetadataError;
use crate::routing::metrics;
use crate::routing::retry::{self, METADATA_POLICY};

/// Role of an attribute in a table's key schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Partition (hash) key: determines item placement.
    Hash,
    /// Sort (range) key: orders items within a partition.
    Range,
}

/// One element of a table's key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

/// The slice of a "describe table" response the resolver reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDescription {
    pub key_schema: Vec<KeySchemaElement>,
}

impl TableDescription {
    /// The hash-key attribute name, if the schema names one.
    pub fn hash_key(&self) -> Option<&str> {
        self.key_schema
            .iter()
            .find(|e| e.key_type == KeyType::Hash)
            .map(|e| e.attribute_name.as_str())
    }
}

/// Client seam for the metadata lookup.
///
/// The real implementation calls the database's describe-table API; tests
/// substitute doubles. Implementations classify their failures via
/// [`MetadataError`], which decides retry-vs-cooldown behavior.
#[async_trait]
pub trait TableMetadata: Send + Sync + 'static {
    /// Describe `table`, returning at least its key schema.
    async fn describe_table(&self, table: &str) -> Result<TableDescription, MetadataError>;
}

/// Cache state for one table.
#[derive(Debug, Clone)]
enum KeyEntry {
    /// Key name resolved; cached indefinitely.
    Resolved(String),
    /// A discovery task is in flight.
    Discovering,
    /// Discovery failed; eligible again once `retry_at` passes.
    Failed { retry_at: Instant },
}

/// Concurrent per-table partition-key cache with asynchronous discovery.
pub struct PartitionKeyCache {
    entries: DashMap<String, KeyEntry>,
    /// How long a failed table stays ineligible for re-discovery.
    cooldown: Duration,
    /// Retries (beyond the first attempt) for transient lookup failures.
    max_retries: usize,
    /// Weak self-handle handed to spawned discovery tasks.
    self_ref: Weak<PartitionKeyCache>,
}

impl PartitionKeyCache {
    /// Create an empty cache.
    pub fn new(cooldown: Duration, max_retries: usize) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| PartitionKeyCache {
            entries: DashMap::new(),
            cooldown,
            max_retries,
            self_ref: self_ref.clone(),
        })
    }

    /// Pre-seed a table's partition key from static configuration.
    pub fn seed(&self, table: impl Into<String>, key_name: impl Into<String>) {
        self.entries
            .insert(table.into(), KeyEntry::Resolved(key_name.into()));
    }

    /// Non-blocking cache read.
    ///
    /// Returns the key name only when resolved; a miss (absent, in-flight,
    /// or failed) returns `None` and triggers no work of its own.
    pub fn partition_key_name(&self, table: &str) -> Option<String> {
        let hit = match self.entries.get(table).map(|e| e.value().clone()) {
            Some(KeyEntry::Resolved(name)) => Some(name),
            _ => None,
        };
        metrics::record_key_lookup(hit.is_some());
        hit
    }

    /// Forget a failure marker so `table` is immediately eligible again.
    pub fn clear_failure(&self, table: &str) {
        let removed = self
            .entries
            .remove_if(table, |_, e| matches!(e, KeyEntry::Failed { .. }));
        if removed.is_some() {
            debug!(table, "Cleared partition-key failure marker");
        }
    }

    /// Start asynchronous discovery for `table`, at most once concurrently.
    ///
    /// Returns whether a discovery task was actually started. Resolved
    /// tables, in-flight discoveries, and failures still in cooldown all
    /// short-circuit without an outbound call.
    pub fn trigger_discovery(&self, table: &str, client: Arc<dyn TableMetadata>) -> bool {
        match self.entries.entry(table.to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get() {
                KeyEntry::Resolved(_) | KeyEntry::Discovering => {
                    metrics::record_key_discovery("short_circuited");
                    return false;
                }
                KeyEntry::Failed { retry_at } => {
                    if Instant::now() < *retry_at {
                        metrics::record_key_discovery("short_circuited");
                        return false;
                    }
                    occupied.insert(KeyEntry::Discovering);
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(KeyEntry::Discovering);
            }
        }

        // The cache is alive (we are it); the task holds a strong handle so
        // a claimed discovery always runs to completion.
        let Some(cache) = self.self_ref.upgrade() else {
            return false;
        };
        let table = table.to_string();
        tokio::spawn(async move {
            cache.run_discovery(table, client).await;
        });
        true
    }

    /// The discovery task body: lookup with retry, then cache the outcome.
    async fn run_discovery(&self, table: String, client: Arc<dyn TableMetadata>) {
        let table_ref = &table;
        let client_ref = &client;
        let result = (|| async {
            metrics::record_retry_attempt(METADATA_POLICY);
            client_ref.describe_table(table_ref).await
        })
        .retry(retry::metadata_policy(self.max_retries))
        .when(|e: &MetadataError| e.is_transient())
        .await;

        match result {
            Ok(description) => match description.hash_key() {
                Some(key_name) => {
                    info!(table = %table, key = key_name, "Resolved partition key");
                    metrics::record_retry_success(METADATA_POLICY);
                    metrics::record_key_discovery("resolved");
                    self.entries
                        .insert(table, KeyEntry::Resolved(key_name.to_string()));
                }
                None => {
                    warn!(table = %table, "Table has no hash key in its key schema");
                    metrics::record_key_discovery("failed");
                    self.install_failure(table);
                }
            },
            Err(e) => {
                if e.is_transient() {
                    metrics::record_retry_exhausted(METADATA_POLICY);
                }
                warn!(
                    table = %table,
                    error = %e,
                    cooldown_secs = self.cooldown.as_secs(),
                    "Partition-key discovery failed"
                );
                metrics::record_key_discovery("failed");
                self.install_failure(table);
            }
        }
    }

    fn install_failure(&self, table: String) {
        self.entries.insert(
            table,
            KeyEntry::Failed {
                retry_at: Instant::now() + self.cooldown,
            },
        );
    }

    /// Whether `table` currently carries a failure marker (elapsed or not).
    /// Diagnostic only.
    pub fn failure_pending(&self, table: &str) -> bool {
        self.entries
            .get(table)
            .map(|e| matches!(e.value(), KeyEntry::Failed { .. }))
            .unwrap_or(false)
    }

    /// Number of cached entries (any state). Diagnostic only.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PartitionKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionKeyCache")
            .field("entries", &self.entries.len())
            .field("cooldown", &self.cooldown)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
