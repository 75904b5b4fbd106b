//! Retry policy for metadata lookups.
//!
//! Partition-key discovery is the only remote call the routing layer retries
//! on its own; everything else (the discovery loop) just waits for its next
//! cycle. The policy lives here so the backoff shape is stated once.
//!
//! | Policy | Min Delay | Max Delay | Retries | Use Case |
//! |--------|-----------|-----------|---------|----------|
//! | `metadata_policy` | 100ms | 2s | configurable | describe-table lookups |
//!
//! Jitter is always on: many client instances discovering the same table
//! after a deploy should not hammer the metadata endpoint in lockstep.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::constants::{KEY_DISCOVERY_MAX_DELAY_MS, KEY_DISCOVERY_MIN_DELAY_MS};

/// Name under which metadata retries are recorded in metrics.
pub const METADATA_POLICY: &str = "metadata";

/// Policy for describe-table metadata lookups.
///
/// `max_retries` counts retries beyond the first attempt, so a value of 3
/// allows 4 calls total. Transience is decided by the caller's `when`
/// condition ([`crate::error::MetadataError::is_transient`]); permanent
/// failures never re-enter the loop.
pub fn metadata_policy(max_retries: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(KEY_DISCOVERY_MIN_DELAY_MS))
        .with_max_delay(Duration::from_millis(KEY_DISCOVERY_MAX_DELAY_MS))
        .with_max_times(max_retries)
        .with_jitter()
}
