//! # keyroute
//! Client-side load balancing and key-affinity routing for distributed
//! key-value database endpoints.
//!
//! keyroute sits in front of a multi-node database endpoint, discovers the
//! current set of live coordinator nodes, and spreads requests across them.
//! For operations where node affinity improves consensus performance, it
//! deterministically routes requests carrying the same partition key to the
//! same node, using a hashing and selection scheme that produces identical
//! routing decisions across independent client implementations in different
//! languages.
//!
//! # Goals
//! - Keep a fresh node list without a central coordinator
//! - Make per-key routing reproducible across clients and languages
//! - Never fail a request because routing had nothing better to offer
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keyroute::prelude::*;
//! use keyroute::routing::{PartitionKeyCache, RequestRouter, TableMetadata};
//! use keyroute::routing::request::{DbRequest, PutItem};
//!
//! # fn metadata_client() -> Arc<dyn TableMetadata> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> keyroute::error::Result<()> {
//!     let config = RouterConfig::with_seeds(["127.0.0.1", "127.0.0.2"]);
//!     let live = LiveNodes::new(&config)?;
//!     live.start();
//!
//!     let keys = PartitionKeyCache::new(
//!         config.key_failure_cooldown,
//!         config.key_discovery_retries,
//!     );
//!     let router = RequestRouter::new(live, keys, metadata_client(), AffinityMode::AnyWrite);
//!
//!     let request = DbRequest::PutItem(PutItem {
//!         table_name: "orders".to_string(),
//!         ..Default::default()
//!     });
//!     let mut route = router.prepare(&request);
//!     let mut target = NodeAddress::new(Scheme::Http, "127.0.0.1", 8000);
//!     router.apply(&mut route, &mut target);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod prng;
pub mod telemetry;
pub mod types;
pub mod value;

pub mod routing;

pub mod prelude {
    //! The user-facing surface in one import.
    pub use crate::config::RouterConfig;
    pub use crate::error::{Error, MetadataError, Result};
    pub use crate::hash::hash_attr;
    pub use crate::routing::{
        AffinityMode, DbRequest, LiveNodes, PlannedRoute, QueryPlan, RequestRouter, RoutingScope,
    };
    pub use crate::types::{NodeAddress, Scheme};
    pub use crate::value::{AttrValue, Item, Number};
}
