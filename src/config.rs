//! Configuration for the routing layer.
//!
//! A single validated [`RouterConfig`] drives every component: the discovery
//! engine (scheme, port, seed hosts, topology scope, refresh cadence), the
//! partition-key resolver (retry budget, failure cooldown, static key seeds),
//! and the interceptor (affinity mode). Validation fails fast at
//! construction time, before any background loop starts.

use std::collections::HashMap;
use std::time::Duration;

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_KEY_DISCOVERY_RETRIES, DEFAULT_KEY_FAILURE_COOLDOWN_SECS,
    DEFAULT_PORT, DEFAULT_REFRESH_INTERVAL_SECS, DISCOVERY_PATH,
};
use crate::error::{Error, Result};
use crate::routing::classify::AffinityMode;
use crate::types::{NodeAddress, Scheme};

/// Configuration for a routing client instance.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Scheme used for every node URI.
    /// Default: http
    pub scheme: Scheme,

    /// Port every coordinator node listens on.
    /// Default: 8000
    pub port: u16,

    /// Initial known hosts; the first snapshot before discovery runs.
    /// Must be non-empty.
    pub seed_hosts: Vec<String>,

    /// Preferred datacenter, if the client should favor local nodes.
    pub datacenter: Option<String>,

    /// Preferred rack within `datacenter`. Requires `datacenter`.
    pub rack: Option<String>,

    /// Sleep between discovery refresh cycles.
    /// Default: 5s
    pub refresh_interval: Duration,

    /// Which requests are eligible for key-based routing.
    /// Default: Disabled
    pub affinity: AffinityMode,

    /// Retries (beyond the first attempt) for transient metadata failures.
    /// Default: 3
    pub key_discovery_retries: usize,

    /// How long a failed table stays ineligible for re-discovery.
    /// Default: 60s
    pub key_failure_cooldown: Duration,

    /// Statically configured partition keys (table name → key attribute),
    /// pre-seeded into the resolver cache so those tables never need a
    /// metadata lookup.
    pub static_partition_keys: HashMap<String, String>,

    /// Timeout for a single discovery HTTP request.
    /// Default: 5s
    pub http_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            scheme: Scheme::Http,
            port: DEFAULT_PORT,
            seed_hosts: Vec::new(),
            datacenter: None,
            rack: None,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            affinity: AffinityMode::Disabled,
            key_discovery_retries: DEFAULT_KEY_DISCOVERY_RETRIES,
            key_failure_cooldown: Duration::from_secs(DEFAULT_KEY_FAILURE_COOLDOWN_SECS),
            static_partition_keys: HashMap::new(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl RouterConfig {
    /// Convenience constructor for the common case: a seed host list with
    /// everything else at defaults.
    pub fn with_seeds<I, T>(seeds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        RouterConfig {
            seed_hosts: seeds.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// The seed hosts as node addresses.
    pub fn seed_addresses(&self) -> Vec<NodeAddress> {
        self.seed_hosts
            .iter()
            .map(|h| NodeAddress::new(self.scheme, h.clone(), self.port))
            .collect()
    }

    /// Validate the configuration.
    ///
    /// Checks, in order: a non-empty seed list, a non-zero port, that every
    /// seed host forms a syntactically valid discovery URI, topology
    /// consistency (rack requires datacenter), and a non-zero refresh
    /// interval.
    pub fn validate(&self) -> Result<()> {
        if self.seed_hosts.is_empty() {
            return Err(Error::Config("seed host list is empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        for addr in self.seed_addresses() {
            let uri = addr.uri_for(DISCOVERY_PATH);
            let parsed = reqwest::Url::parse(&uri).map_err(|e| Error::InvalidEndpoint {
                uri: uri.clone(),
                reason: e.to_string(),
            })?;
            // Url::parse will happily absorb a host containing a path or
            // userinfo separator; insist the parts round-trip.
            if parsed.host_str() != Some(addr.host.as_str())
                && parsed.host_str() != Some(addr.host.to_ascii_lowercase().as_str())
            {
                return Err(Error::InvalidEndpoint {
                    uri,
                    reason: format!("host '{}' does not parse cleanly", addr.host),
                });
            }
        }
        if self.rack.is_some() && self.datacenter.is_none() {
            return Err(Error::Config(
                "rack configured without a datacenter".to_string(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(Error::Config(
                "refresh interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_needs_seeds() {
        let config = RouterConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_seeds_validates() {
        let config = RouterConfig::with_seeds(["127.0.0.1", "127.0.0.2"]);
        config.validate().expect("valid config");
        let addrs = config.seed_addresses();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].port, DEFAULT_PORT);
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = RouterConfig::with_seeds(["127.0.0.1"]);
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_host_rejected() {
        let config = RouterConfig::with_seeds(["bad host"]);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_host_with_path_rejected() {
        let config = RouterConfig::with_seeds(["example.com/evil"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rack_requires_datacenter() {
        let mut config = RouterConfig::with_seeds(["127.0.0.1"]);
        config.rack = Some("r1".to_string());
        assert!(config.validate().is_err());

        config.datacenter = Some("dc1".to_string());
        config.validate().expect("rack with datacenter is valid");
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let mut config = RouterConfig::with_seeds(["127.0.0.1"]);
        config.refresh_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
