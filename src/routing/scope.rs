//! Topology scopes for node discovery.
//!
//! A routing scope narrows discovery to part of the cluster topology and
//! optionally falls back to a broader scope when its own filter yields no
//! nodes. Scopes form an immutable singly-linked chain built once at
//! configuration time (rack → datacenter → cluster), so cycles are
//! structurally impossible and chains are freely shareable across threads.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// One link in the discovery fallback chain.
///
/// The cluster scope filters nothing and is always terminal; datacenter and
/// rack scopes carry a query filter and usually a broader fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingScope {
    name: &'static str,
    description: String,
    filter: String,
    fallback: Option<Arc<RoutingScope>>,
}

impl RoutingScope {
    /// The whole cluster: empty filter, no fallback.
    pub fn cluster() -> Arc<Self> {
        Arc::new(RoutingScope {
            name: "cluster",
            description: "whole cluster".to_string(),
            filter: String::new(),
            fallback: None,
        })
    }

    /// A single datacenter, optionally falling back to a broader scope.
    pub fn datacenter(dc: &str, fallback: Option<Arc<RoutingScope>>) -> Arc<Self> {
        Arc::new(RoutingScope {
            name: "datacenter",
            description: format!("datacenter '{dc}'"),
            filter: format!("dc={dc}"),
            fallback,
        })
    }

    /// A single rack within a datacenter, optionally falling back to a
    /// broader scope.
    pub fn rack(dc: &str, rack: &str, fallback: Option<Arc<RoutingScope>>) -> Arc<Self> {
        Arc::new(RoutingScope {
            name: "rack",
            description: format!("rack '{rack}' in datacenter '{dc}'"),
            filter: format!("dc={dc}&rack={rack}"),
            fallback,
        })
    }

    /// Build the full chain for a configured topology position.
    ///
    /// Rack and datacenter narrow the scope when present; each narrower scope
    /// falls back to the next broader one, ending at the cluster scope. A
    /// rack without a datacenter is rejected because the discovery endpoint
    /// only understands racks qualified by datacenter.
    pub fn from_topology(datacenter: Option<&str>, rack: Option<&str>) -> Result<Arc<Self>> {
        match (datacenter, rack) {
            (None, None) => Ok(Self::cluster()),
            (Some(dc), None) => Ok(Self::datacenter(dc, Some(Self::cluster()))),
            (Some(dc), Some(rack)) => Ok(Self::rack(
                dc,
                rack,
                Some(Self::datacenter(dc, Some(Self::cluster()))),
            )),
            (None, Some(rack)) => Err(Error::Config(format!(
                "rack '{rack}' configured without a datacenter"
            ))),
        }
    }

    /// Short scope kind name, used as a metrics/log label.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Human-readable description of what this scope covers.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Discovery query filter for this scope; empty means no filtering.
    #[inline]
    pub fn local_filter(&self) -> &str {
        &self.filter
    }

    /// The next, broader scope, if any.
    #[inline]
    pub fn fallback(&self) -> Option<&Arc<RoutingScope>> {
        self.fallback.as_ref()
    }

    /// Walk this scope and every fallback after it, narrowest first.
    pub fn chain<'a>(&'a self) -> impl Iterator<Item = &'a RoutingScope> + 'a {
        std::iter::successors(Some(self), |s| s.fallback().map(|f| f.as_ref()))
    }
}

impl fmt::Display for RoutingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
