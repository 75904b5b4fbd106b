//! Crate-level errors.
//!
//! The crate uses a two-layer error hierarchy:
//!
//! - [`Error`]: routing, configuration, and discovery errors surfaced to
//!   callers of the routing layer.
//! - [`MetadataError`]: failures of the table-metadata lookup used by the
//!   partition-key resolver, carrying the transient/permanent classification
//!   that drives its retry and cooldown policy.
//!
//! [`MetadataError`] converts into [`Error`] via `From`, so metadata
//! failures can propagate through routing entry points when needed.

use std::result;

use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

/// Routing and configuration errors.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// Invalid configuration, rejected before any background work starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A scheme/host/port combination does not form a valid endpoint URI.
    #[error("invalid endpoint URI '{uri}': {reason}")]
    InvalidEndpoint { uri: String, reason: String },

    /// The live-node snapshot is empty; there is no node to route to.
    #[error("no live nodes known")]
    NoLiveNodes,

    /// A discovery-endpoint request failed at the transport level.
    #[error("discovery request failed: {0}")]
    Discovery(String),

    /// A metadata lookup failed.
    #[error("metadata lookup failed: {0}")]
    Metadata(#[from] MetadataError),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Discovery(e.to_string())
    }
}

/// Failures of the "describe table" metadata lookup.
///
/// The partition-key resolver retries transient failures with backoff and
/// cooldown-gates permanent ones, so the classification here is load-bearing:
/// adding a variant means deciding which side of [`is_transient`] it lands on.
///
/// [`is_transient`]: MetadataError::is_transient
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum MetadataError {
    /// The table does not exist. Permanent.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// The caller may not describe the table. Permanent.
    #[error("access denied describing table '{0}'")]
    AccessDenied(String),

    /// The server asked us to slow down. Transient.
    #[error("throttled: {0}")]
    Throttled(String),

    /// Server-side failure (5xx-class). Transient.
    #[error("server error: {0}")]
    Server(String),

    /// Anything else. Permanent.
    #[error("{0}")]
    Other(String),
}

impl MetadataError {
    /// Whether the resolver should retry this failure with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, MetadataError::Throttled(_) | MetadataError::Server(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(MetadataError::Throttled("slow down".into()).is_transient());
        assert!(MetadataError::Server("500".into()).is_transient());
        assert!(!MetadataError::TableNotFound("t".into()).is_transient());
        assert!(!MetadataError::AccessDenied("t".into()).is_transient());
        assert!(!MetadataError::Other("boom".into()).is_transient());
    }

    #[test]
    fn test_metadata_error_converts() {
        let e: Error = MetadataError::TableNotFound("orders".into()).into();
        assert!(matches!(e, Error::Metadata(_)));
        assert_eq!(e.to_string(), "metadata lookup failed: table 'orders' not found");
    }

    #[test]
    fn test_error_display() {
        let e = Error::InvalidEndpoint {
            uri: "http://:0".into(),
            reason: "empty host".into(),
        };
        assert_eq!(e.to_string(), "invalid endpoint URI 'http://:0': empty host");
        assert_eq!(Error::NoLiveNodes.to_string(), "no live nodes known");
    }
}
