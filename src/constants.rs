//! Centralized configuration constants.
//!
//! This module consolidates the magic numbers and protocol literals used by
//! the routing layer. Having them in one place makes it easier to:
//!
//! - Understand the discovery protocol constraints
//! - Update values consistently
//! - Document the rationale for each constant
//!
//! # Categories
//!
//! - **Discovery Constants**: the `/localnodes` endpoint and refresh cadence
//! - **Key Resolution Constants**: partition-key discovery retry/cooldown
//! - **Network Constants**: HTTP client limits for the polling loop

// =============================================================================
// Discovery Constants
// =============================================================================

/// Path of the node-discovery endpoint on every coordinator node.
///
/// A GET returns a JSON array of bare address strings, optionally filtered
/// by the query string a routing scope supplies (`dc=<name>`,
/// `dc=<name>&rack=<name>`).
pub const DISCOVERY_PATH: &str = "/localnodes";

/// Default coordinator port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default sleep between discovery refresh cycles, in seconds.
///
/// Node membership changes are rare relative to request traffic; 5 seconds
/// keeps the snapshot fresh without measurable load on the cluster.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5;

/// Rack name used by the filtering-support probe.
///
/// Filtering support is detected by asking for a rack that cannot exist and
/// checking whether the result size changes. The name only has to be
/// implausible, not reserved.
pub const PROBE_RACK_NAME: &str = "keyroute-probe-nonexistent-rack";

// =============================================================================
// Key Resolution Constants
// =============================================================================

/// Default number of retries (beyond the first attempt) for transient
/// metadata-lookup failures.
pub const DEFAULT_KEY_DISCOVERY_RETRIES: usize = 3;

/// Default cooldown, in seconds, before a failed table becomes eligible for
/// re-discovery.
///
/// Permanent failures (missing table, access denied, exhausted retries) are
/// cached for this long so hot request paths don't re-trigger lookups that
/// just failed.
pub const DEFAULT_KEY_FAILURE_COOLDOWN_SECS: u64 = 60;

/// Minimum backoff delay between metadata-lookup retries, in milliseconds.
pub const KEY_DISCOVERY_MIN_DELAY_MS: u64 = 100;

/// Maximum backoff delay between metadata-lookup retries, in milliseconds.
pub const KEY_DISCOVERY_MAX_DELAY_MS: u64 = 2_000;

// =============================================================================
// Network Constants
// =============================================================================

/// Default timeout for a single discovery HTTP request, in seconds.
///
/// The refresh loop runs every few seconds; a request slower than this is
/// better treated as a failed cycle than allowed to stall the loop.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Idle connections kept per discovery target.
///
/// The discovery loop is a single low-rate poller; one pooled connection per
/// host is its entire footprint.
pub const DISCOVERY_POOL_MAX_IDLE_PER_HOST: usize = 1;

// =============================================================================
// Tests
// =============================================================================
