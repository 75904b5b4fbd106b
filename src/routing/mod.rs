//! Client-side routing: discovery, selection, and key affinity.
//!
//! This module is the crate's domain core. Requests flow through it like so:
//!
//! ```text
//!            ┌────────────────┐   eligible? key name? key value?
//!  request ─▶│ RequestRouter  │──────────────┬──────────────────┐
//!            └────────────────┘              │                  │
//!                   │                 ┌──────▼──────┐    ┌──────▼──────┐
//!                   │                 │ classify +  │    │  hash_attr  │
//!                   │                 │ keycache    │    │   (seed)    │
//!                   │                 └─────────────┘    └──────┬──────┘
//!            ┌──────▼──────┐                                    │
//!            │  QueryPlan  │◀───────────────────────────────────┘
//!            └──────┬──────┘       seeded (PRNG) or unseeded (uniform)
//!                   │ pulls snapshot
//!            ┌──────▼──────┐   background refresh over the scope chain
//!            │  LiveNodes  │◀───────────── /localnodes
//!            └─────────────┘
//! ```
//!
//! [`discovery::LiveNodes`] keeps the snapshot fresh; [`plan::QueryPlan`]
//! orders nodes per request; [`keycache::PartitionKeyCache`] learns partition
//! keys; [`classify`] decides eligibility; [`interceptor::RequestRouter`]
//! ties it together at the SDK's hook points.

pub mod classify;
pub mod discovery;
pub mod interceptor;
pub mod keycache;
pub mod metrics;
pub mod plan;
pub mod request;
pub mod retry;
pub mod scope;

pub use classify::AffinityMode;
pub use discovery::LiveNodes;
pub use interceptor::{PlannedRoute, RequestRouter};
pub use keycache::{
    KeySchemaElement, KeyType, PartitionKeyCache, TableDescription, TableMetadata,
};
pub use plan::QueryPlan;
pub use request::DbRequest;
pub use scope::RoutingScope;
